//! Stable, sortable identifiers for graph entities.
//!
//! Every persistable entity (scene, node, socket, edge) carries a 26-character
//! ULID-style identifier: a 48-bit millisecond timestamp followed by 80 bits
//! of randomness, Crockford-base32 encoded. IDs sort roughly by creation time
//! and collide only with negligible probability.
//!
//! The generator owns its entropy source explicitly so that multiple scenes
//! (and test runs) never interfere through hidden global state. Seed it with
//! [`IdGenerator::with_seed`] for reproducible tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Length of an encoded identifier.
pub const ID_LEN: usize = 26;

/// Crockford base32 alphabet (no I, L, O, U).
const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// A stable identifier for a graph entity.
///
/// Wraps the 26-character encoded form. Equality and hashing are by string
/// value, so IDs survive serialization round-trips unchanged.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    /// Wrap an already-encoded identifier without checking it.
    ///
    /// Use [`Uid::parse`] when the input is untrusted.
    pub fn from_string(s: String) -> Self {
        Uid(s)
    }

    /// Parse an identifier, rejecting anything that is not 26 Crockford
    /// base32 characters.
    ///
    /// The check is purely syntactic: it proves the string *could* have been
    /// produced by a generator, not that it actually was.
    pub fn parse(s: &str) -> Option<Self> {
        if is_valid(s) {
            Some(Uid(s.to_owned()))
        } else {
            None
        }
    }

    /// The encoded form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid({})", self.0)
    }
}

/// Syntactic validity check: length 26, Crockford base32 alphabet.
pub fn is_valid(s: &str) -> bool {
    s.len() == ID_LEN && s.bytes().all(|b| ALPHABET.contains(&b.to_ascii_uppercase()))
}

/// Generator of [`Uid`] values with an owned entropy source.
///
/// IDs minted within the same millisecond have *no* guaranteed ordering
/// relative to each other: the random suffix is drawn fresh on every call and
/// is never incremented within a tick. This matches the documented behavior
/// of the original scheme and is deliberate.
pub struct IdGenerator {
    rng: StdRng,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    /// Create a generator seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a deterministically seeded generator for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Mint a fresh identifier stamped with the current wall-clock time.
    pub fn generate(&mut self) -> Uid {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.generate_at(millis)
    }

    /// Mint an identifier with an explicit millisecond timestamp.
    ///
    /// Exposed so tests can pin the time component.
    pub fn generate_at(&mut self, millis: u64) -> Uid {
        let random: u128 = ((self.rng.gen::<u64>() as u128) << 16) | self.rng.gen::<u16>() as u128;
        let value: u128 = ((millis as u128 & 0xFFFF_FFFF_FFFF) << 80) | (random & ((1 << 80) - 1));
        Uid(encode(value))
    }
}

/// Encode a 128-bit value as 26 Crockford base32 characters, most significant
/// character first. The top two bits of the first character are always zero.
fn encode(mut value: u128) -> String {
    let mut buf = [0u8; ID_LEN];
    for slot in buf.iter_mut().rev() {
        *slot = ALPHABET[(value & 0x1F) as usize];
        value >>= 5;
    }
    // The alphabet is ASCII, so this cannot fail.
    String::from_utf8_lossy(&buf).into_owned()
}
