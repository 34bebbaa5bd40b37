//! Rerouting existing edges to a different socket.
//!
//! Triggered on a socket that already has connections: the real edges are
//! hidden and replaced by provisional previews running from each *other*
//! endpoint to the pointer. On release over a target socket every affected
//! edge's new pairing is validated individually; edges that would become
//! invalid keep their original connection, valid ones are reattached in
//! place (the edge object survives, only its endpoint changes). Release
//! over nothing reverts all previews with no change.

use crate::dragging::clear_exclusive_socket;
use crate::id::Uid;
use crate::path::PathSegment;
use crate::scene::{Scene, UnlinkOptions};
use crate::validation::ValidatorSet;
use tracing::debug;

struct RerouteEntry {
    /// The hidden real edge being rerouted.
    original: Uid,
    /// The endpoint that stays where it is.
    fixed: Uid,
    /// Provisional preview edge from `fixed` towards the pointer.
    preview: Uid,
}

struct RerouteState {
    source: Uid,
    entries: Vec<RerouteEntry>,
    position: (f32, f32),
}

/// In-progress reroute of all edges connected to one socket.
#[derive(Default)]
pub struct EdgeRerouter {
    state: Option<RerouteState>,
}

impl EdgeRerouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// Begin rerouting every edge connected to `socket`. Returns false if
    /// the socket is unknown, has no complete edges, or a reroute is
    /// already active.
    pub fn begin(&mut self, scene: &mut Scene, socket: &Uid) -> bool {
        if self.state.is_some() {
            return false;
        }
        let position = match scene.socket_position(socket) {
            Some(p) => p,
            None => return false,
        };
        let edge_ids: Vec<Uid> = scene
            .socket(socket)
            .map(|s| s.edges().to_vec())
            .unwrap_or_default();
        let mut entries = Vec::new();
        for id in edge_ids {
            let Some(edge) = scene.edge(&id) else {
                continue;
            };
            if edge.provisional {
                continue;
            }
            let Some(fixed) = edge.other_end(socket).cloned() else {
                continue;
            };
            let style = edge.style;
            let Ok(preview) = scene.connect(&fixed, None, style) else {
                continue;
            };
            if let Some(preview_edge) = scene.edge_mut(&preview) {
                preview_edge.provisional = true;
            }
            if let Some(original) = scene.edge_mut(&id) {
                original.hidden = true;
            }
            entries.push(RerouteEntry {
                original: id,
                fixed,
                preview,
            });
        }
        if entries.is_empty() {
            return false;
        }
        self.state = Some(RerouteState {
            source: socket.clone(),
            entries,
            position,
        });
        true
    }

    /// Track the pointer; all previews follow.
    pub fn update(&mut self, position: (f32, f32)) {
        if let Some(state) = &mut self.state {
            state.position = position;
        }
    }

    /// Drawable preview paths at the current pointer position, one per
    /// rerouted edge.
    pub fn preview_paths(&self, scene: &Scene) -> Vec<(Uid, Vec<PathSegment>)> {
        let Some(state) = &self.state else {
            return Vec::new();
        };
        state
            .entries
            .iter()
            .filter_map(|e| {
                scene
                    .edge_path(&e.preview, Some(state.position))
                    .map(|path| (e.preview.clone(), path))
            })
            .collect()
    }

    /// Finish the reroute. Previews are always discarded and originals
    /// unhidden. With a target socket, each edge's new pairing is validated
    /// individually: accepted edges are reattached to the target, rejected
    /// ones keep their original connection. Returns the number of edges
    /// actually reattached.
    pub fn release(
        &mut self,
        scene: &mut Scene,
        validators: &ValidatorSet,
        target: Option<&Uid>,
    ) -> usize {
        let Some(state) = self.state.take() else {
            return 0;
        };
        Self::teardown(scene, &state);
        let Some(target) = target else {
            return 0;
        };
        if target == &state.source || scene.socket(target).is_none() {
            return 0;
        }

        let accepted: Vec<&RerouteEntry> = state
            .entries
            .iter()
            .filter(|e| {
                let verdict = validators.validate(scene, &e.fixed, target);
                if !verdict.is_accepted() {
                    debug!(edge = %e.original, ?verdict, "reroute rejected for edge");
                }
                verdict.is_accepted()
            })
            .collect();
        if accepted.is_empty() {
            return 0;
        }
        clear_exclusive_socket(scene, target);
        let mut moved = 0;
        for entry in accepted {
            if scene.reattach_edge(&entry.original, &state.source, target) {
                moved += 1;
            }
        }
        moved
    }

    /// Abort the reroute: discard previews, unhide originals.
    pub fn cancel(&mut self, scene: &mut Scene) {
        if let Some(state) = self.state.take() {
            Self::teardown(scene, &state);
        }
    }

    fn teardown(scene: &mut Scene, state: &RerouteState) {
        for entry in &state.entries {
            scene.unlink_edge(
                &entry.preview,
                UnlinkOptions {
                    silent: true,
                    silent_for_socket: None,
                },
            );
            if let Some(edge) = scene.edge_mut(&entry.original) {
                edge.hidden = false;
            }
        }
    }
}
