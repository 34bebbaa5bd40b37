//! Dragging a new edge out of a socket.
//!
//! State machine: press over a socket creates a *provisional* edge (real
//! arena object, unselectable, excluded from snapshots) with no destination;
//! pointer moves update the tracked position; release over another socket
//! runs the validator chain and, if accepted, commits a real edge —
//! disconnecting existing edges first on any endpoint that disallows
//! multiple connections. Release over empty space discards the drag with no
//! state change.

use crate::edge::EdgeStyle;
use crate::id::Uid;
use crate::path::PathSegment;
use crate::scene::{Scene, UnlinkOptions};
use crate::validation::ValidatorSet;
use tracing::debug;

struct DragState {
    provisional: Uid,
    start: Uid,
    style: EdgeStyle,
    position: (f32, f32),
}

/// In-progress edge drag. One instance per pointer; inactive between drags.
#[derive(Default)]
pub struct EdgeDrag {
    state: Option<DragState>,
}

impl EdgeDrag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// The socket the drag started from, while active.
    pub fn start_socket(&self) -> Option<&Uid> {
        self.state.as_ref().map(|s| &s.start)
    }

    /// Begin a drag from `socket`. No-op (returns false) if the socket is
    /// unknown or a drag is already active.
    pub fn begin(&mut self, scene: &mut Scene, socket: &Uid, style: EdgeStyle) -> bool {
        if self.state.is_some() {
            return false;
        }
        let position = match scene.socket_position(socket) {
            Some(p) => p,
            None => return false,
        };
        let provisional = match scene.connect(socket, None, style) {
            Ok(id) => id,
            Err(_) => return false,
        };
        if let Some(edge) = scene.edge_mut(&provisional) {
            edge.provisional = true;
        }
        self.state = Some(DragState {
            provisional,
            start: socket.clone(),
            style,
            position,
        });
        true
    }

    /// Track the pointer. The provisional edge's preview follows this
    /// position.
    pub fn update(&mut self, position: (f32, f32)) {
        if let Some(state) = &mut self.state {
            state.position = position;
        }
    }

    /// Drawable path of the provisional edge at the current pointer
    /// position.
    pub fn preview_path(&self, scene: &Scene) -> Option<Vec<PathSegment>> {
        let state = self.state.as_ref()?;
        scene.edge_path(&state.provisional, Some(state.position))
    }

    /// Finish the drag. The provisional edge is always discarded; a real
    /// edge is created only when `target` is a socket and every validator
    /// accepts the pair. Rejection is a silent no-op.
    pub fn release(
        &mut self,
        scene: &mut Scene,
        validators: &ValidatorSet,
        target: Option<&Uid>,
    ) -> Option<Uid> {
        let state = self.state.take()?;
        scene.unlink_edge(
            &state.provisional,
            UnlinkOptions {
                silent: true,
                silent_for_socket: None,
            },
        );
        let target = target?;
        if target == &state.start {
            return None;
        }
        let verdict = validators.validate(scene, &state.start, target);
        if !verdict.is_accepted() {
            debug!(start = %state.start, end = %target, ?verdict, "connection rejected");
            return None;
        }
        clear_exclusive_socket(scene, &state.start);
        clear_exclusive_socket(scene, target);
        scene.connect(&state.start, Some(target), state.style).ok()
    }

    /// Abort the drag, removing the provisional edge.
    pub fn cancel(&mut self, scene: &mut Scene) {
        if let Some(state) = self.state.take() {
            scene.unlink_edge(
                &state.provisional,
                UnlinkOptions {
                    silent: true,
                    silent_for_socket: None,
                },
            );
        }
    }
}

/// Remove every existing edge on a socket that disallows multiple
/// connections, making room for the incoming one.
pub(crate) fn clear_exclusive_socket(scene: &mut Scene, socket: &Uid) {
    let multi = scene.socket(socket).map(|s| s.multi_edges).unwrap_or(true);
    if multi {
        return;
    }
    let existing: Vec<Uid> = scene
        .socket(socket)
        .map(|s| s.edges().to_vec())
        .unwrap_or_default();
    for edge in existing {
        scene.remove_edge(&edge);
    }
}
