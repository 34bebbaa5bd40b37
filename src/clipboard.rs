//! Copy/cut/paste of a selection subgraph.
//!
//! The clipboard payload is an ordinary serializable value, so hosts can
//! move it through a system clipboard as JSON. Edges are copied only when
//! *both* endpoint nodes are selected; an edge with exactly one selected
//! endpoint is silently dropped, which is what keeps pasted payloads free
//! of dangling references.

use crate::edge::EdgeSnapshot;
use crate::id::Uid;
use crate::node::NodeSnapshot;
use crate::scene::{IdMap, Scene};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Serialized selection subgraph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipboardPayload {
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
}

impl ClipboardPayload {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-left corner of the bounding box of the contained nodes.
    fn origin(&self) -> (f32, f32) {
        let min_x = self
            .nodes
            .iter()
            .map(|n| n.pos_x)
            .fold(f32::INFINITY, f32::min);
        let min_y = self
            .nodes
            .iter()
            .map(|n| n.pos_y)
            .fold(f32::INFINITY, f32::min);
        (min_x, min_y)
    }
}

/// Serialize the current selection. Selected edges survive only if the
/// nodes owning both their endpoint sockets are selected too.
pub fn copy_selection(scene: &Scene) -> ClipboardPayload {
    let selected_nodes: HashSet<Uid> = scene.selected_nodes().into_iter().collect();
    let nodes: Vec<NodeSnapshot> = scene
        .nodes()
        .iter()
        .filter(|n| selected_nodes.contains(n.id()))
        .map(|n| n.snapshot())
        .collect();

    let owner_selected = |socket: Option<&Uid>| {
        socket
            .and_then(|s| scene.socket_owner(s))
            .map(|n| selected_nodes.contains(n.id()))
            .unwrap_or(false)
    };
    let edges: Vec<EdgeSnapshot> = scene
        .selected_edges()
        .iter()
        .filter_map(|id| scene.edge(id))
        .filter(|e| owner_selected(e.start()) && owner_selected(e.end()))
        .map(|e| e.snapshot())
        .collect();

    ClipboardPayload { nodes, edges }
}

/// Copy the selection, then remove it from the scene. The caller records
/// the history entry.
pub fn cut_selection(scene: &mut Scene) -> ClipboardPayload {
    let payload = copy_selection(scene);
    for edge in scene.selected_edges() {
        scene.remove_edge(&edge);
    }
    for node in scene.selected_nodes() {
        scene.remove_node(&node);
    }
    payload
}

/// Re-create the payload's subgraph with fresh IDs, translated so the
/// payload's bounding-box top-left lands at `reference` (typically the
/// pointer position). Selection is replaced by exactly the new items.
/// Returns the IDs of the created nodes.
pub fn paste(scene: &mut Scene, payload: &ClipboardPayload, reference: (f32, f32)) -> Vec<Uid> {
    if payload.is_empty() {
        return Vec::new();
    }
    let (min_x, min_y) = payload.origin();
    let (dx, dy) = (reference.0 - min_x, reference.1 - min_y);

    let was_silent = scene.silent_selection_events;
    scene.silent_selection_events = true;
    scene.deselect_all(true);

    let mut id_map = IdMap::new();
    let mut created = Vec::with_capacity(payload.nodes.len());
    for snap in &payload.nodes {
        let id = scene.build_node(snap, false, &mut id_map);
        if let Some(node) = scene.node_mut(&id) {
            let (x, y) = node.position();
            node.set_position(x + dx, y + dy);
        }
        scene.select_node(&id);
        created.push(id);
    }
    for snap in &payload.edges {
        let start = snap.start.as_ref().and_then(|s| id_map.get(s)).cloned();
        let end = snap.end.as_ref().and_then(|s| id_map.get(s)).cloned();
        let (Some(start), Some(end)) = (start, end) else {
            continue;
        };
        if let Ok(edge) = scene.connect(&start, Some(&end), snap.edge_type) {
            scene.select_edge(&edge);
        }
    }

    scene.poll_selection_change();
    scene.silent_selection_events = was_silent;
    created
}
