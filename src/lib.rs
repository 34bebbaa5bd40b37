//! # Flowgraph
//!
//! A rendering-agnostic node-graph editor core: typed sockets, undoable
//! scene mutations, clipboard, interchangeable edge path routing, and the
//! interaction tools (dragging, rerouting, drop-to-insert, snapping) that
//! turn continuous pointer input into discrete graph edits.
//!
//! ## Features
//!
//! - **Owning scene arena** - Nodes, sockets and edges live in one
//!   [`Scene`]; cross references are plain IDs, so removal cascades are
//!   explicit and observable
//! - **Pluggable validation** - Named edge validators composed with AND
//!   semantics via [`ValidatorSet`]
//! - **Linear undo/redo** - Full-scene snapshots reconciled in place, so
//!   node and edge identities survive restores ([`SceneHistory`])
//! - **Extensible node types** - Integer operation codes mapped to boxed
//!   [`NodeBehavior`] implementations in a [`NodeRegistry`]
//! - **Versioned persistence** - JSON files with a legacy migration hook
//!
//! ## Quick Start
//!
//! ```
//! use flowgraph::{EdgeStyle, Scene};
//!
//! let mut scene = Scene::new();
//! let source = scene.create_node("Source", 0, &[], &[1]);
//! let sink = scene.create_node("Sink", 0, &[1], &[]);
//! let out = scene.node(&source).unwrap().output(0).unwrap().id().clone();
//! let inp = scene.node(&sink).unwrap().input(0).unwrap().id().clone();
//! let edge = scene.connect(&out, Some(&inp), EdgeStyle::Bezier).unwrap();
//! assert!(scene.socket(&inp).unwrap().has_edge(&edge));
//! ```
//!
//! Most hosts want the [`GraphEditor`] facade, which owns a scene together
//! with its history, validators, registry, clipboard and interaction tools
//! and records the right history entry after each user-visible step.

pub mod bridge;
pub mod clipboard;
pub mod dragging;
pub mod edge;
pub mod editor;
pub mod history;
pub mod id;
pub mod intersect;
pub mod node;
pub mod path;
pub mod persist;
pub mod registry;
pub mod rerouting;
pub mod scene;
pub mod snapping;
pub mod socket;
pub mod validation;

// Re-export the core types and tools
pub use bridge::{HostBridge, NullBridge};
pub use clipboard::{copy_selection, cut_selection, paste, ClipboardPayload};
pub use dragging::EdgeDrag;
pub use edge::{Edge, EdgeSnapshot, EdgeStyle};
pub use editor::GraphEditor;
pub use history::{RestoreReport, SceneHistory, HISTORY_LIMIT};
pub use id::{IdGenerator, Uid};
pub use intersect::{
    edges_intersecting_node, node_rect, segment_intersects_rect, try_insert_node_on_edge,
    Insertion, Rect,
};
pub use node::{Node, NodeSnapshot};
pub use path::{calc_path, distance_to_path, sample_path, PathSegment};
pub use persist::{load_scene, load_scene_with_migration, save_scene, PersistError, FILE_VERSION};
pub use registry::{EvalError, NodeBehavior, NodeRegistry, RegistryEntry, RegistryError};
pub use rerouting::EdgeRerouter;
pub use scene::{
    ConnectError, IdMap, Scene, SceneSnapshot, SelectionChange, UnlinkOptions, SNAPSHOT_VERSION,
};
pub use snapping::{snap_to_socket, snapped_position, SnapResult, SNAP_RADIUS};
pub use socket::{Socket, SocketDirection, SocketSide, SocketSnapshot};
pub use validation::{
    matching_type_tag, no_same_direction, no_same_node, ValidationResult, Validator, ValidatorError,
    ValidatorSet,
};
