//! Edges connecting two sockets.
//!
//! An [`Edge`] is a plain record in the scene arena: a pair of optional
//! socket IDs plus a path style. The destination end is absent while the
//! edge is being dragged. Edges are created and destroyed exclusively
//! through [`Scene::connect`](crate::scene::Scene::connect) and
//! [`Scene::unlink_edge`](crate::scene::Scene::unlink_edge), which keep the
//! scene edge list and both sockets' edge lists consistent.

use crate::id::Uid;
use serde::{Deserialize, Serialize};

/// The five interchangeable path routing styles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeStyle {
    /// Single straight segment.
    Direct,
    /// One cubic curve with horizontal control points.
    Bezier,
    /// Three axis-aligned segments through a weighted midpoint.
    Square,
    /// Fixed horizontal escape segments plus a straight middle.
    ImprovedSharp,
    /// Fixed horizontal escape segments plus a distance-scaled curve.
    ImprovedBezier,
}

impl Default for EdgeStyle {
    fn default() -> Self {
        EdgeStyle::Bezier
    }
}

/// A connection between two sockets.
#[derive(Debug, Clone)]
pub struct Edge {
    id: Uid,
    /// The output-ish end.
    pub(crate) start: Option<Uid>,
    /// The input-ish end; absent while the edge is being dragged.
    pub(crate) end: Option<Uid>,
    pub style: EdgeStyle,
    /// Provisional edges visualize an in-progress drag. They are
    /// unselectable and excluded from snapshots.
    pub provisional: bool,
    /// Hidden edges stay in the arena but ask the presentation layer not to
    /// paint them (used while rerouting shows previews instead).
    pub hidden: bool,
}

impl Edge {
    pub(crate) fn new(id: Uid, start: Option<Uid>, end: Option<Uid>, style: EdgeStyle) -> Self {
        Self {
            id,
            start,
            end,
            style,
            provisional: false,
            hidden: false,
        }
    }

    pub fn id(&self) -> &Uid {
        &self.id
    }

    pub fn start(&self) -> Option<&Uid> {
        self.start.as_ref()
    }

    pub fn end(&self) -> Option<&Uid> {
        self.end.as_ref()
    }

    /// Whether `socket` is one of this edge's endpoints.
    pub fn touches(&self, socket: &Uid) -> bool {
        self.start.as_ref() == Some(socket) || self.end.as_ref() == Some(socket)
    }

    /// The endpoint opposite to `socket`, if both are known.
    pub fn other_end(&self, socket: &Uid) -> Option<&Uid> {
        if self.start.as_ref() == Some(socket) {
            self.end.as_ref()
        } else if self.end.as_ref() == Some(socket) {
            self.start.as_ref()
        } else {
            None
        }
    }

    pub fn snapshot(&self) -> EdgeSnapshot {
        EdgeSnapshot {
            sid: self.id.clone(),
            edge_type: self.style,
            start: self.start.clone(),
            end: self.end.clone(),
        }
    }
}

/// Serialized form of an edge. Socket references are stored as the sockets'
/// `sid` values and resolved through the ID-remap table on load/paste.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub sid: Uid,
    pub edge_type: EdgeStyle,
    pub start: Option<Uid>,
    pub end: Option<Uid>,
}
