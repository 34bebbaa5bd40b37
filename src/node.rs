//! Graph nodes: socket owners with opaque content and lazy-evaluation flags.
//!
//! A [`Node`] owns its input and output [`Socket`]s; everything else it
//! refers to (connected edges, downstream nodes) lives in the scene arena
//! and is reached by ID. Node "business" behavior is not part of this type:
//! concrete behaviors are registered by operation code in the
//! [`NodeRegistry`](crate::registry::NodeRegistry) and dispatched during
//! evaluation.

use crate::id::{IdGenerator, Uid};
use crate::scene::IdMap;
use crate::socket::{Socket, SocketDirection, SocketSide, SocketSnapshot};
use serde::{Deserialize, Serialize};

/// A graph vertex with typed connection points and node-type-specific state.
#[derive(Debug, Clone)]
pub struct Node {
    id: Uid,
    pub title: String,
    pub x: f32,
    pub y: f32,
    /// Operation code selecting the registered behavior; 0 means "plain".
    pub op_code: u32,
    /// Side on which input sockets are laid out.
    pub input_side: SocketSide,
    /// Side on which output sockets are laid out.
    pub output_side: SocketSide,
    inputs: Vec<Socket>,
    outputs: Vec<Socket>,
    /// Opaque node-type-specific payload, serialized verbatim.
    pub content: serde_json::Value,
    dirty: bool,
    invalid: bool,
    /// Human-readable reason recorded when evaluation fails.
    pub invalid_reason: Option<String>,
    /// Last evaluation result; runtime-only, never serialized.
    pub(crate) eval_cache: Option<serde_json::Value>,
}

impl Node {
    pub fn new(gen: &mut IdGenerator, title: impl Into<String>, op_code: u32) -> Self {
        Self {
            id: gen.generate(),
            title: title.into(),
            x: 0.0,
            y: 0.0,
            op_code,
            input_side: SocketSide::LeftBottom,
            output_side: SocketSide::RightTop,
            inputs: Vec::new(),
            outputs: Vec::new(),
            content: serde_json::Value::Null,
            dirty: false,
            invalid: false,
            invalid_reason: None,
            eval_cache: None,
        }
    }

    pub fn id(&self) -> &Uid {
        &self.id
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }

    // ------------------------------------------------------------------
    // Sockets
    // ------------------------------------------------------------------

    /// Build the socket lists from per-socket type tags.
    ///
    /// With `reset` (the normal case) existing sockets are discarded first,
    /// so afterwards `inputs().len() == input_tags.len()` and every socket's
    /// `index` matches its list position. Input sockets accept a single edge;
    /// output sockets accept many.
    pub fn init_sockets(
        &mut self,
        gen: &mut IdGenerator,
        input_tags: &[i32],
        output_tags: &[i32],
        reset: bool,
    ) {
        if reset {
            self.inputs.clear();
            self.outputs.clear();
        }
        let input_base = self.inputs.len();
        for (offset, &tag) in input_tags.iter().enumerate() {
            self.inputs.push(Socket::new(
                gen,
                self.id.clone(),
                input_base + offset,
                self.input_side,
                tag,
                false,
                SocketDirection::Input,
            ));
        }
        let output_base = self.outputs.len();
        for (offset, &tag) in output_tags.iter().enumerate() {
            self.outputs.push(Socket::new(
                gen,
                self.id.clone(),
                output_base + offset,
                self.output_side,
                tag,
                true,
                SocketDirection::Output,
            ));
        }
    }

    pub fn inputs(&self) -> &[Socket] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Socket] {
        &self.outputs
    }

    pub fn input(&self, index: usize) -> Option<&Socket> {
        self.inputs.get(index)
    }

    pub fn output(&self, index: usize) -> Option<&Socket> {
        self.outputs.get(index)
    }

    /// All sockets, inputs first.
    pub fn sockets(&self) -> impl Iterator<Item = &Socket> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    pub(crate) fn sockets_mut(&mut self) -> impl Iterator<Item = &mut Socket> {
        self.inputs.iter_mut().chain(self.outputs.iter_mut())
    }

    pub fn socket(&self, id: &Uid) -> Option<&Socket> {
        self.sockets().find(|s| s.id() == id)
    }

    pub(crate) fn socket_mut(&mut self, id: &Uid) -> Option<&mut Socket> {
        self.sockets_mut().find(|s| s.id() == id)
    }

    /// First input socket with no connected edge.
    pub fn free_input(&self) -> Option<&Socket> {
        self.inputs.iter().find(|s| !s.is_connected())
    }

    /// First output socket with no connected edge.
    pub fn free_output(&self) -> Option<&Socket> {
        self.outputs.iter().find(|s| !s.is_connected())
    }

    /// Whether any socket has a connected edge.
    pub fn has_connections(&self) -> bool {
        self.sockets().any(|s| s.is_connected())
    }

    // ------------------------------------------------------------------
    // Dirty / invalid flags
    // ------------------------------------------------------------------

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    pub fn mark_dirty(&mut self, value: bool) {
        self.dirty = value;
        if value {
            self.eval_cache = None;
        }
    }

    pub fn mark_invalid(&mut self, value: bool) {
        self.invalid = value;
        if !value {
            self.invalid_reason = None;
        }
    }

    pub(crate) fn clear_flags(&mut self) {
        self.dirty = false;
        self.invalid = false;
        self.invalid_reason = None;
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            sid: self.id.clone(),
            title: self.title.clone(),
            pos_x: self.x,
            pos_y: self.y,
            op_code: self.op_code,
            inputs: self.inputs.iter().map(Socket::snapshot).collect(),
            outputs: self.outputs.iter().map(Socket::snapshot).collect(),
            content: self.content.clone(),
        }
    }

    /// Construct a node from a snapshot, recording ID mappings for the node
    /// and all its sockets in `id_map`.
    pub fn from_snapshot(
        snap: &NodeSnapshot,
        restore_id: bool,
        gen: &mut IdGenerator,
        id_map: &mut IdMap,
    ) -> Self {
        let mut node = Node::new(gen, snap.title.clone(), snap.op_code);
        node.apply_snapshot(snap, restore_id, gen, id_map);
        node
    }

    /// Overwrite this node's state from a snapshot.
    ///
    /// Socket lists are rebuilt (not appended): each incoming socket record
    /// replaces whatever previously sat at its side and index, and surplus
    /// sockets are dropped. Socket edge lists come back empty; the scene's
    /// edge reconciliation re-registers surviving edges afterwards.
    pub fn apply_snapshot(
        &mut self,
        snap: &NodeSnapshot,
        restore_id: bool,
        gen: &mut IdGenerator,
        id_map: &mut IdMap,
    ) {
        if restore_id {
            self.id = snap.sid.clone();
        }
        id_map.insert(snap.sid.clone(), self.id.clone());
        self.title = snap.title.clone();
        self.x = snap.pos_x;
        self.y = snap.pos_y;
        self.op_code = snap.op_code;
        self.content = snap.content.clone();
        self.inputs = snap
            .inputs
            .iter()
            .map(|s| Socket::from_snapshot(s, self.id.clone(), restore_id, gen, id_map))
            .collect();
        self.outputs = snap
            .outputs
            .iter()
            .map(|s| Socket::from_snapshot(s, self.id.clone(), restore_id, gen, id_map))
            .collect();
        if let Some(first) = self.inputs.first() {
            self.input_side = first.side;
        }
        if let Some(first) = self.outputs.first() {
            self.output_side = first.side;
        }
        self.eval_cache = None;
    }
}

/// Serialized form of a node, including the full serialized form of every
/// socket and the opaque content payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub sid: Uid,
    pub title: String,
    pub pos_x: f32,
    pub pos_y: f32,
    #[serde(default)]
    pub op_code: u32,
    pub inputs: Vec<SocketSnapshot>,
    pub outputs: Vec<SocketSnapshot>,
    #[serde(default)]
    pub content: serde_json::Value,
}
