//! Magnetic snapping of a pointer position to nearby sockets.

use crate::id::Uid;
use crate::scene::Scene;

/// Default snap radius in scene units.
pub const SNAP_RADIUS: f32 = 24.0;

/// The socket a position snapped to, and its exact center.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapResult {
    pub socket: Uid,
    pub position: (f32, f32),
}

/// Find the socket nearest to `position` within a square window of
/// `radius`. Ties between candidates inside the window are broken by
/// squared Euclidean distance. Returns the socket's exact center so drags
/// feel magnetic near sockets.
pub fn snap_to_socket(scene: &Scene, position: (f32, f32), radius: f32) -> Option<SnapResult> {
    let mut best: Option<(Uid, (f32, f32), f32)> = None;
    for (socket, center) in scene.socket_positions() {
        let dx = center.0 - position.0;
        let dy = center.1 - position.1;
        if dx.abs() > radius || dy.abs() > radius {
            continue;
        }
        let dist_sq = dx * dx + dy * dy;
        let closer = best.as_ref().map(|(_, _, d)| dist_sq < *d).unwrap_or(true);
        if closer {
            best = Some((socket.clone(), center, dist_sq));
        }
    }
    best.map(|(socket, position, _)| SnapResult { socket, position })
}

/// Snap if a socket is in range, otherwise keep the raw position.
pub fn snapped_position(scene: &Scene, position: (f32, f32), radius: f32) -> (f32, f32) {
    snap_to_socket(scene, position, radius)
        .map(|s| s.position)
        .unwrap_or(position)
}
