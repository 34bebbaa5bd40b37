//! Pluggable edge validation.
//!
//! Interaction tools run every registered validator before committing a
//! connection; all of them must accept (AND semantics). A rejected
//! connection is a normal outcome, not a fault: the attempt is simply not
//! performed, and the reject reason is only used for logging.
//!
//! The validator set is explicit, owned state with a documented lifecycle
//! (construct, register, clear-for-tests), never a process-wide singleton.

use crate::id::Uid;
use crate::scene::Scene;
use thiserror::Error;

/// Outcome of checking one candidate socket pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Accept,
    /// Rejected, with a human-readable reason.
    Reject(String),
}

impl ValidationResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationResult::Accept)
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        ValidationResult::Reject(reason.into())
    }

    /// Combine two results: the first rejection wins.
    pub fn and(self, other: ValidationResult) -> ValidationResult {
        match self {
            ValidationResult::Accept => other,
            reject => reject,
        }
    }
}

/// A validator inspects a candidate `(start, end)` socket pair in the
/// context of the scene.
pub type Validator = Box<dyn Fn(&Scene, &Uid, &Uid) -> ValidationResult>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidatorError {
    #[error("a validator named {0:?} is already registered")]
    Duplicate(String),
}

/// Ordered, named collection of validators, combined with AND semantics.
#[derive(Default)]
pub struct ValidatorSet {
    entries: Vec<(String, Validator)>,
}

impl ValidatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validator under a unique name. Registering the same name
    /// twice is a programmer error and fails loudly rather than overwrite.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        validator: impl Fn(&Scene, &Uid, &Uid) -> ValidationResult + 'static,
    ) -> Result<(), ValidatorError> {
        let name = name.into();
        if self.entries.iter().any(|(n, _)| n == &name) {
            return Err(ValidatorError::Duplicate(name));
        }
        self.entries.push((name, Box::new(validator)));
        Ok(())
    }

    /// Remove a validator by name.
    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| n != name);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every validator in registration order; the first rejection
    /// short-circuits. An empty set accepts everything.
    pub fn validate(&self, scene: &Scene, start: &Uid, end: &Uid) -> ValidationResult {
        for (_, validator) in &self.entries {
            let result = validator(scene, start, end);
            if !result.is_accepted() {
                return result;
            }
        }
        ValidationResult::Accept
    }
}

// ----------------------------------------------------------------------
// Reference validators
// ----------------------------------------------------------------------

/// Reject edges between two inputs or two outputs.
pub fn no_same_direction(scene: &Scene, start: &Uid, end: &Uid) -> ValidationResult {
    match (scene.socket(start), scene.socket(end)) {
        (Some(a), Some(b)) if a.direction == b.direction => {
            ValidationResult::reject("sockets have the same direction")
        }
        (Some(_), Some(_)) => ValidationResult::Accept,
        _ => ValidationResult::reject("unknown socket"),
    }
}

/// Reject edges whose endpoints belong to the same node.
pub fn no_same_node(scene: &Scene, start: &Uid, end: &Uid) -> ValidationResult {
    match (scene.socket(start), scene.socket(end)) {
        (Some(a), Some(b)) if a.node() == b.node() => {
            ValidationResult::reject("sockets belong to the same node")
        }
        (Some(_), Some(_)) => ValidationResult::Accept,
        _ => ValidationResult::reject("unknown socket"),
    }
}

/// Reject edges between sockets with different type tags.
pub fn matching_type_tag(scene: &Scene, start: &Uid, end: &Uid) -> ValidationResult {
    match (scene.socket(start), scene.socket(end)) {
        (Some(a), Some(b)) if a.type_tag != b.type_tag => {
            ValidationResult::reject("socket type tags do not match")
        }
        (Some(_), Some(_)) => ValidationResult::Accept,
        _ => ValidationResult::reject("unknown socket"),
    }
}
