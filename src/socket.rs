//! Typed connection points owned by nodes.
//!
//! A [`Socket`] belongs to exactly one [`Node`](crate::node::Node) for its
//! entire life and keeps a list of the edges connected to it. The list holds
//! edge *IDs* only; the scene arena owns the edges themselves, and only the
//! scene's connect/unlink funnel ever mutates the list.

use crate::id::{IdGenerator, Uid};
use serde::{Deserialize, Serialize};

/// Horizontal distance between a node's left edge and its right-hand sockets.
pub const NODE_WIDTH: f32 = 180.0;
/// Vertical extent used to place center/bottom sockets.
pub const NODE_HEIGHT: f32 = 240.0;
/// Vertical spacing between sibling sockets on the same side.
pub const SOCKET_SPACING: f32 = 22.0;
/// Top margin before the first top-anchored socket.
const TOP_MARGIN: f32 = 24.0;
/// Bottom margin before the first bottom-anchored socket.
const BOTTOM_MARGIN: f32 = 16.0;

/// One of six symmetric positions a socket can occupy on its node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketSide {
    LeftTop,
    LeftCenter,
    LeftBottom,
    RightTop,
    RightCenter,
    RightBottom,
}

impl SocketSide {
    /// Whether the socket faces left (edges exit towards negative x).
    pub fn is_left(self) -> bool {
        matches!(
            self,
            SocketSide::LeftTop | SocketSide::LeftCenter | SocketSide::LeftBottom
        )
    }

    /// Whether the socket faces right (edges exit towards positive x).
    pub fn is_right(self) -> bool {
        !self.is_left()
    }
}

/// Dataflow direction of a socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketDirection {
    Input,
    Output,
}

/// A typed connection point on a node.
#[derive(Debug, Clone)]
pub struct Socket {
    id: Uid,
    /// Owning node, back-reference only.
    node: Uid,
    /// 0-based position among siblings on the same side.
    pub index: usize,
    pub side: SocketSide,
    /// Integer tag used for color and compatibility checks.
    pub type_tag: i32,
    /// Whether more than one edge may connect here at once.
    pub multi_edges: bool,
    pub direction: SocketDirection,
    /// Connected edge IDs. No ownership; kept consistent by the scene.
    edges: Vec<Uid>,
}

impl Socket {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gen: &mut IdGenerator,
        node: Uid,
        index: usize,
        side: SocketSide,
        type_tag: i32,
        multi_edges: bool,
        direction: SocketDirection,
    ) -> Self {
        Self {
            id: gen.generate(),
            node,
            index,
            side,
            type_tag,
            multi_edges,
            direction,
            edges: Vec::new(),
        }
    }

    pub fn id(&self) -> &Uid {
        &self.id
    }

    /// The node this socket belongs to.
    pub fn node(&self) -> &Uid {
        &self.node
    }

    pub fn edges(&self) -> &[Uid] {
        &self.edges
    }

    pub fn is_connected(&self) -> bool {
        !self.edges.is_empty()
    }

    pub fn has_edge(&self, edge: &Uid) -> bool {
        self.edges.contains(edge)
    }

    /// Register an edge. Only the scene's connect funnel calls this.
    pub(crate) fn add_edge(&mut self, edge: Uid) {
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    /// Deregister an edge. Only the scene's unlink funnel calls this.
    pub(crate) fn remove_edge(&mut self, edge: &Uid) {
        self.edges.retain(|e| e != edge);
    }

    pub(crate) fn clear_edges(&mut self) {
        self.edges.clear();
    }

    /// Position of the socket center relative to its node's top-left corner.
    ///
    /// The core is rendering-agnostic but still needs deterministic socket
    /// geometry for path routing and snapping; a presentation layer is free
    /// to track its own positions through the scene hooks instead.
    pub fn offset(&self) -> (f32, f32) {
        let x = if self.side.is_left() { 0.0 } else { NODE_WIDTH };
        let y = match self.side {
            SocketSide::LeftTop | SocketSide::RightTop => {
                TOP_MARGIN + self.index as f32 * SOCKET_SPACING
            }
            SocketSide::LeftCenter | SocketSide::RightCenter => {
                NODE_HEIGHT / 2.0 + self.index as f32 * SOCKET_SPACING
            }
            SocketSide::LeftBottom | SocketSide::RightBottom => {
                NODE_HEIGHT - BOTTOM_MARGIN - self.index as f32 * SOCKET_SPACING
            }
        };
        (x, y)
    }

    pub fn snapshot(&self) -> SocketSnapshot {
        SocketSnapshot {
            sid: self.id.clone(),
            index: self.index,
            side: self.side,
            type_tag: self.type_tag,
            multi_edges: self.multi_edges,
            direction: self.direction,
        }
    }

    /// Rebuild a socket from a snapshot.
    ///
    /// With `restore_id` the snapshot's `sid` is adopted; otherwise a fresh
    /// one is minted (paste). Either way the old `sid` is recorded in
    /// `id_map` so edge endpoints can be resolved afterwards.
    pub fn from_snapshot(
        snap: &SocketSnapshot,
        node: Uid,
        restore_id: bool,
        gen: &mut IdGenerator,
        id_map: &mut crate::scene::IdMap,
    ) -> Self {
        let id = if restore_id {
            snap.sid.clone()
        } else {
            gen.generate()
        };
        id_map.insert(snap.sid.clone(), id.clone());
        Self {
            id,
            node,
            index: snap.index,
            side: snap.side,
            type_tag: snap.type_tag,
            multi_edges: snap.multi_edges,
            direction: snap.direction,
            edges: Vec::new(),
        }
    }
}

/// Serialized form of a socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketSnapshot {
    pub sid: Uid,
    pub index: usize,
    pub side: SocketSide,
    pub type_tag: i32,
    pub multi_edges: bool,
    pub direction: SocketDirection,
}
