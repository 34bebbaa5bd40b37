//! Node type registry and the evaluation contract.
//!
//! Concrete node behaviors (arithmetic, string ops, file I/O and so on) are
//! external collaborators: they implement [`NodeBehavior`] and register
//! under a small positive integer operation code. The registry drives both
//! deserialization (picking the concrete setup for an incoming record) and
//! lazy evaluation.
//!
//! The registry is explicit, owned, test-clearable state, never a hidden
//! process-wide table.

use crate::id::Uid;
use crate::node::NodeSnapshot;
use crate::scene::Scene;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

/// Error raised by a concrete node's evaluation. Caught locally by the
/// evaluation driver; never propagates to sibling nodes or the scene.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct EvalError(pub String);

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        EvalError(message.into())
    }
}

/// The evaluation contract of a concrete node type.
///
/// Implementations read their inputs through the scene (see
/// [`Scene::input_source`]) and return an opaque JSON value. Returning
/// `Err` marks the node invalid with the error text as the reason.
pub trait NodeBehavior {
    fn eval(&self, scene: &Scene, node: &Uid) -> Result<Value, EvalError>;
}

/// Everything needed to build and run nodes of one operation code.
pub struct RegistryEntry {
    pub title: String,
    pub category: String,
    pub input_tags: Vec<i32>,
    pub output_tags: Vec<i32>,
    pub behavior: Box<dyn NodeBehavior>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("operation code {0} is already registered")]
    Duplicate(u32),
}

/// Mapping from operation code to node type.
#[derive(Default)]
pub struct NodeRegistry {
    entries: HashMap<u32, RegistryEntry>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node type. Registering a taken code fails loudly rather
    /// than overwrite.
    pub fn register(&mut self, op_code: u32, entry: RegistryEntry) -> Result<(), RegistryError> {
        if self.entries.contains_key(&op_code) {
            return Err(RegistryError::Duplicate(op_code));
        }
        self.entries.insert(op_code, entry);
        Ok(())
    }

    pub fn unregister(&mut self, op_code: u32) -> Option<RegistryEntry> {
        self.entries.remove(&op_code)
    }

    pub fn get(&self, op_code: u32) -> Option<&RegistryEntry> {
        self.entries.get(&op_code)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All registered operation codes, sorted.
    pub fn codes(&self) -> Vec<u32> {
        let mut codes: Vec<u32> = self.entries.keys().copied().collect();
        codes.sort_unstable();
        codes
    }

    /// Operation codes in one category, sorted.
    pub fn by_category(&self, category: &str) -> Vec<u32> {
        let mut codes: Vec<u32> = self
            .entries
            .iter()
            .filter(|(_, e)| e.category == category)
            .map(|(c, _)| *c)
            .collect();
        codes.sort_unstable();
        codes
    }

    /// Build a node of the given type and add it to the scene.
    pub fn instantiate(&self, scene: &mut Scene, op_code: u32) -> Option<Uid> {
        let entry = self.entries.get(&op_code)?;
        Some(scene.create_node(
            entry.title.clone(),
            op_code,
            &entry.input_tags,
            &entry.output_tags,
        ))
    }

    /// A node factory closure suitable for
    /// [`Scene::set_node_factory`], capturing a snapshot of the registry's
    /// socket layouts so deserialization picks the registered setup for
    /// known operation codes.
    pub fn node_factory(&self) -> crate::scene::NodeFactory {
        let layouts: HashMap<u32, (String, Vec<i32>, Vec<i32>)> = self
            .entries
            .iter()
            .map(|(code, e)| {
                (
                    *code,
                    (e.title.clone(), e.input_tags.clone(), e.output_tags.clone()),
                )
            })
            .collect();
        Box::new(move |snap: &NodeSnapshot, gen| {
            let mut node = crate::node::Node::new(gen, snap.title.clone(), snap.op_code);
            if let Some((_, inputs, outputs)) = layouts.get(&snap.op_code) {
                node.init_sockets(gen, inputs, outputs, true);
            }
            node
        })
    }

    /// Evaluate a node, caching the result until the node goes dirty.
    ///
    /// An evaluation error is node-local: the node is marked invalid with
    /// the error text as its reason, downstream nodes are marked invalid,
    /// and `None` is returned. Nothing else in the scene is touched.
    pub fn evaluate(&self, scene: &mut Scene, node_id: &Uid) -> Option<Value> {
        let node = scene.node(node_id)?;
        if !node.is_dirty() {
            if let Some(cached) = &node.eval_cache {
                return Some(cached.clone());
            }
        }
        let entry = self.entries.get(&node.op_code)?;
        match entry.behavior.eval(scene, node_id) {
            Ok(value) => {
                if let Some(node) = scene.node_mut(node_id) {
                    node.mark_dirty(false);
                    node.mark_invalid(false);
                    node.eval_cache = Some(value.clone());
                }
                Some(value)
            }
            Err(err) => {
                warn!(node = %node_id, error = %err, "node evaluation failed");
                if let Some(node) = scene.node_mut(node_id) {
                    node.mark_invalid(true);
                    node.invalid_reason = Some(err.0);
                }
                scene.mark_descendants_invalid(node_id);
                None
            }
        }
    }
}
