//! Dropping a node onto an edge to splice it in.
//!
//! While a node is dragged, its bounding box is hit-tested against the
//! sampled polylines of existing edges. On drop, if exactly one eligible
//! edge intersects and the node has both a free input and a free output,
//! the edge is replaced by two new edges routed through the node,
//! preserving the original path style. Nodes that already have any
//! connection, or lack a free input or output, are never eligible.

use crate::edge::EdgeStyle;
use crate::id::Uid;
use crate::path::sample_path;
use crate::scene::Scene;
use crate::socket::{NODE_HEIGHT, NODE_WIDTH};
use tracing::debug;

/// Points per curve segment when flattening edge paths for hit tests.
const CURVE_SAMPLES: usize = 16;

/// Axis-aligned node bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn contains(&self, point: (f32, f32)) -> bool {
        point.0 >= self.x
            && point.0 <= self.x + self.width
            && point.1 >= self.y
            && point.1 <= self.y + self.height
    }

    fn corners(&self) -> [(f32, f32); 4] {
        [
            (self.x, self.y),
            (self.x + self.width, self.y),
            (self.x + self.width, self.y + self.height),
            (self.x, self.y + self.height),
        ]
    }
}

/// Bounding box of a node in scene coordinates.
pub fn node_rect(scene: &Scene, node: &Uid) -> Option<Rect> {
    let node = scene.node(node)?;
    Some(Rect {
        x: node.x,
        y: node.y,
        width: NODE_WIDTH,
        height: NODE_HEIGHT,
    })
}

fn orientation(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> f32 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

fn segments_intersect(a: (f32, f32), b: (f32, f32), c: (f32, f32), d: (f32, f32)) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);
    ((o1 > 0.0) != (o2 > 0.0)) && ((o3 > 0.0) != (o4 > 0.0))
}

/// Whether a line segment touches a rectangle (endpoint inside or crossing
/// a border).
pub fn segment_intersects_rect(a: (f32, f32), b: (f32, f32), rect: &Rect) -> bool {
    if rect.contains(a) || rect.contains(b) {
        return true;
    }
    let corners = rect.corners();
    for i in 0..4 {
        if segments_intersect(a, b, corners[i], corners[(i + 1) % 4]) {
            return true;
        }
    }
    false
}

/// All visible, complete edges whose sampled path crosses the node's
/// bounding box, excluding edges already connected to the node itself.
pub fn edges_intersecting_node(scene: &Scene, node: &Uid) -> Vec<Uid> {
    let Some(rect) = node_rect(scene, node) else {
        return Vec::new();
    };
    let own_sockets: Vec<Uid> = scene
        .node(node)
        .map(|n| n.sockets().map(|s| s.id().clone()).collect())
        .unwrap_or_default();

    let mut hits = Vec::new();
    for edge in scene.edges() {
        if edge.provisional || edge.hidden || edge.end().is_none() {
            continue;
        }
        if own_sockets.iter().any(|s| edge.touches(s)) {
            continue;
        }
        let Some(path) = scene.edge_path(edge.id(), None) else {
            continue;
        };
        let points = sample_path(&path, CURVE_SAMPLES);
        if points
            .windows(2)
            .any(|w| segment_intersects_rect(w[0], w[1], &rect))
        {
            hits.push(edge.id().clone());
        }
    }
    hits
}

/// The two edges created by a successful insertion: into the node's input
/// and out of its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    pub incoming: Uid,
    pub outgoing: Uid,
}

/// Attempt to splice the dropped node into an intersecting edge.
///
/// Succeeds only when the node is eligible (no connections, a free input
/// and a free output) and exactly one edge intersects its bounding box.
/// The original edge is removed and replaced by two edges carrying its
/// path style.
pub fn try_insert_node_on_edge(scene: &mut Scene, node: &Uid) -> Option<Insertion> {
    let (free_input, free_output) = {
        let n = scene.node(node)?;
        if n.has_connections() {
            return None;
        }
        (
            n.free_input()?.id().clone(),
            n.free_output()?.id().clone(),
        )
    };

    let mut hits = edges_intersecting_node(scene, node);
    if hits.len() != 1 {
        return None;
    }
    let edge_id = hits.remove(0);
    let (start, end, style): (Uid, Uid, EdgeStyle) = {
        let edge = scene.edge(&edge_id)?;
        (edge.start()?.clone(), edge.end()?.clone(), edge.style)
    };

    scene.remove_edge(&edge_id);
    let incoming = scene.connect(&start, Some(&free_input), style).ok()?;
    let outgoing = scene.connect(&free_output, Some(&end), style).ok()?;
    debug!(node = %node, replaced = %edge_id, "node inserted into edge");
    Some(Insertion { incoming, outgoing })
}
