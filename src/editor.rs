//! High-level editor facade tying the pieces together.
//!
//! The [`GraphEditor`] reduces boilerplate by owning one scene plus its
//! history, validator set, node registry, clipboard and interaction tools,
//! and by recording the right history entry after each user-visible step.
//! Hosts that need finer control can use the underlying components
//! directly; everything the editor does goes through their public APIs.
//!
//! # Example
//!
//! ```
//! use flowgraph::GraphEditor;
//!
//! let mut editor = GraphEditor::new();
//! let a = editor.add_custom_node("Source", &[], &[1]);
//! let b = editor.add_custom_node("Sink", &[1], &[]);
//! let out = editor.scene().node(&a).unwrap().output(0).unwrap().id().clone();
//! let inp = editor.scene().node(&b).unwrap().input(0).unwrap().id().clone();
//!
//! editor.begin_edge_drag(&out);
//! let target = editor.scene().socket_position(&inp).unwrap();
//! editor.drag_edge_to(target);
//! editor.release_edge_drag(target);
//! assert_eq!(editor.scene().edges().len(), 1);
//!
//! editor.undo();
//! assert!(editor.scene().edges().is_empty());
//! ```

use crate::clipboard::{self, ClipboardPayload};
use crate::dragging::EdgeDrag;
use crate::edge::EdgeStyle;
use crate::history::SceneHistory;
use crate::id::{IdGenerator, Uid};
use crate::intersect::{self, Insertion};
use crate::persist::{self, PersistError};
use crate::registry::NodeRegistry;
use crate::rerouting::EdgeRerouter;
use crate::scene::Scene;
use crate::snapping::{self, SNAP_RADIUS};
use crate::validation::ValidatorSet;
use std::path::Path;

/// One scene plus the collaborators a host needs to edit it.
pub struct GraphEditor {
    scene: Scene,
    history: SceneHistory,
    validators: ValidatorSet,
    registry: NodeRegistry,
    drag: EdgeDrag,
    rerouter: EdgeRerouter,
    clipboard: Option<ClipboardPayload>,
    edge_style: EdgeStyle,
    snap_radius: f32,
}

impl Default for GraphEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphEditor {
    pub fn new() -> Self {
        Self::with_generator(IdGenerator::new())
    }

    pub fn with_generator(gen: IdGenerator) -> Self {
        let mut scene = Scene::with_generator(gen);
        let mut history = SceneHistory::new();
        history.store(&mut scene, "Initial History Stamp", false);
        Self {
            scene,
            history,
            validators: ValidatorSet::new(),
            registry: NodeRegistry::new(),
            drag: EdgeDrag::new(),
            rerouter: EdgeRerouter::new(),
            clipboard: None,
            edge_style: EdgeStyle::default(),
            snap_radius: SNAP_RADIUS,
        }
    }

    // ------------------------------------------------------------------
    // Component access
    // ------------------------------------------------------------------

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn history(&self) -> &SceneHistory {
        &self.history
    }

    pub fn validators(&self) -> &ValidatorSet {
        &self.validators
    }

    pub fn validators_mut(&mut self) -> &mut ValidatorSet {
        &mut self.validators
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut NodeRegistry {
        &mut self.registry
    }

    /// Path style applied to newly created edges.
    pub fn set_edge_style(&mut self, style: EdgeStyle) {
        self.edge_style = style;
    }

    pub fn set_snap_radius(&mut self, radius: f32) {
        self.snap_radius = radius;
    }

    // ------------------------------------------------------------------
    // Node management
    // ------------------------------------------------------------------

    /// Instantiate a registered node type and record the edit.
    pub fn add_node(&mut self, op_code: u32) -> Option<Uid> {
        let id = self.registry.instantiate(&mut self.scene, op_code)?;
        self.history.store(&mut self.scene, "Added node", true);
        Some(id)
    }

    /// Add an ad-hoc node with explicit socket type tags.
    pub fn add_custom_node(
        &mut self,
        title: impl Into<String>,
        input_tags: &[i32],
        output_tags: &[i32],
    ) -> Uid {
        let id = self
            .scene
            .create_node(title, 0, input_tags, output_tags);
        self.history.store(&mut self.scene, "Added node", true);
        id
    }

    /// Remove the selected edges and nodes, recording one history entry.
    pub fn delete_selected(&mut self) {
        let edges = self.scene.selected_edges();
        let nodes = self.scene.selected_nodes();
        if edges.is_empty() && nodes.is_empty() {
            return;
        }
        for edge in edges {
            self.scene.remove_edge(&edge);
        }
        for node in nodes {
            self.scene.remove_node(&node);
        }
        self.scene.poll_selection_change();
        self.history.store(&mut self.scene, "Deleted selected items", true);
    }

    /// Finish a node drag: move the node, then try to splice it into an
    /// intersecting edge. Returns the insertion when one happened.
    pub fn drop_node(&mut self, node: &Uid, position: (f32, f32)) -> Option<Insertion> {
        if !self.scene.move_node(node, position.0, position.1) {
            return None;
        }
        let insertion = intersect::try_insert_node_on_edge(&mut self.scene, node);
        let description = if insertion.is_some() {
            "Inserted node into edge"
        } else {
            "Moved node"
        };
        self.history.store(&mut self.scene, description, true);
        insertion
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Poll for a selection change and record it in history. Call once per
    /// user-visible step, after selection mutations.
    pub fn update_selection(&mut self) -> bool {
        match self.scene.poll_selection_change() {
            Some(change) => {
                let description = if change.deselected_everything {
                    "Deselected Everything"
                } else {
                    "Selection Changed"
                };
                self.history.store(&mut self.scene, description, false);
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.scene).is_some()
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.scene).is_some()
    }

    // ------------------------------------------------------------------
    // Clipboard
    // ------------------------------------------------------------------

    pub fn copy(&mut self) {
        self.clipboard = Some(clipboard::copy_selection(&self.scene));
    }

    pub fn cut(&mut self) {
        self.clipboard = Some(clipboard::cut_selection(&mut self.scene));
        self.history.store(&mut self.scene, "Cut out elements", true);
    }

    /// Paste the clipboard near `reference`. Returns the new node IDs.
    pub fn paste(&mut self, reference: (f32, f32)) -> Vec<Uid> {
        let Some(payload) = &self.clipboard else {
            return Vec::new();
        };
        let created = clipboard::paste(&mut self.scene, payload, reference);
        if !created.is_empty() {
            self.history.store(&mut self.scene, "Pasted elements", true);
        }
        created
    }

    // ------------------------------------------------------------------
    // Edge dragging
    // ------------------------------------------------------------------

    pub fn begin_edge_drag(&mut self, socket: &Uid) -> bool {
        self.drag.begin(&mut self.scene, socket, self.edge_style)
    }

    /// Track the pointer during a drag, snapping to nearby sockets.
    pub fn drag_edge_to(&mut self, position: (f32, f32)) {
        let snapped = snapping::snapped_position(&self.scene, position, self.snap_radius);
        self.drag.update(snapped);
    }

    /// Release the drag at a pointer position: the target socket (if any)
    /// is resolved by snapping. Creates an edge only when the validators
    /// accept the pair.
    pub fn release_edge_drag(&mut self, position: (f32, f32)) -> Option<Uid> {
        let target = snapping::snap_to_socket(&self.scene, position, self.snap_radius)
            .map(|s| s.socket);
        let created = self
            .drag
            .release(&mut self.scene, &self.validators, target.as_ref());
        if created.is_some() {
            self.history.store(&mut self.scene, "Connected sockets", true);
        }
        created
    }

    pub fn cancel_edge_drag(&mut self) {
        self.drag.cancel(&mut self.scene);
    }

    // ------------------------------------------------------------------
    // Rerouting
    // ------------------------------------------------------------------

    pub fn begin_reroute(&mut self, socket: &Uid) -> bool {
        self.rerouter.begin(&mut self.scene, socket)
    }

    pub fn reroute_to(&mut self, position: (f32, f32)) {
        let snapped = snapping::snapped_position(&self.scene, position, self.snap_radius);
        self.rerouter.update(snapped);
    }

    /// Release the reroute at a pointer position. One history entry covers
    /// all reattached edges.
    pub fn release_reroute(&mut self, position: (f32, f32)) -> usize {
        let target = snapping::snap_to_socket(&self.scene, position, self.snap_radius)
            .map(|s| s.socket);
        let moved = self
            .rerouter
            .release(&mut self.scene, &self.validators, target.as_ref());
        if moved > 0 {
            self.history.store(&mut self.scene, "Rerouted edges", true);
        }
        moved
    }

    pub fn cancel_reroute(&mut self) {
        self.rerouter.cancel(&mut self.scene);
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    pub fn save(&mut self, path: &Path) -> Result<(), PersistError> {
        persist::save_scene(&mut self.scene, path)
    }

    /// Load a file into the scene, wiring the registry's node factory and
    /// restarting history with a fresh baseline.
    pub fn load(&mut self, path: &Path) -> Result<(), PersistError> {
        self.scene.set_node_factory(self.registry.node_factory());
        persist::load_scene(&mut self.scene, path)?;
        self.history = SceneHistory::new();
        self.history
            .store(&mut self.scene, "Initial History Stamp", false);
        Ok(())
    }
}
