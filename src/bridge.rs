//! Optional host integration point.
//!
//! Hosting applications can stash extra per-node state outside the
//! serialized payload (live variable bindings, UI state) by installing a
//! [`HostBridge`] on the scene. The core never requires one: [`NullBridge`]
//! is installed by default and answers every query with "absent".

use crate::id::Uid;
use serde_json::Value;

/// Two-method contract between the graph core and a hosting application.
pub trait HostBridge {
    /// Fetch a host-side value for a node, if the host tracks one.
    fn get(&self, node: &Uid, key: &str) -> Option<Value>;

    /// Store a host-side value for a node.
    fn set(&mut self, node: &Uid, key: &str, value: Value);
}

/// Default bridge: always absent, stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBridge;

impl HostBridge for NullBridge {
    fn get(&self, _node: &Uid, _key: &str) -> Option<Value> {
        None
    }

    fn set(&mut self, _node: &Uid, _key: &str, _value: Value) {}
}
