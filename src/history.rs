//! Linear undo/redo over full-scene snapshots.
//!
//! Every undoable mutation finishes by asking [`SceneHistory::store`] for a
//! new stamp: a complete [`SceneSnapshot`] plus the selection active at that
//! moment. Undo and redo move a cursor over the stamp list and restore the
//! snapshot at the cursor into the live scene in place, so node and edge
//! objects are reused rather than replaced across restores.
//!
//! The history is external to the scene (it borrows the scene mutably per
//! call); a baseline stamp recorded right after creating or loading a scene
//! is what makes the first real edit undoable.

use crate::id::Uid;
use crate::scene::{IdMap, Scene, SceneSnapshot};
use tracing::debug;

/// Maximum number of stamps retained; the oldest entry is discarded once
/// exceeded.
pub const HISTORY_LIMIT: usize = 32;

/// One undo step: a snapshot plus the selection recorded with it.
pub struct HistoryStamp {
    pub description: String,
    snapshot: SceneSnapshot,
    selected_nodes: Vec<Uid>,
    selected_edges: Vec<Uid>,
}

/// What a restore did to the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreReport {
    /// True when the restored selection differs from the selection
    /// immediately before the operation. Consumers that only refresh on
    /// actual selection changes key off this.
    pub selection_changed: bool,
}

/// Undo/redo stack with a cursor. `can_undo` requires the cursor to sit
/// above the baseline stamp; `can_redo` requires discarded-then-restored
/// stamps ahead of it.
pub struct SceneHistory {
    stamps: Vec<HistoryStamp>,
    current: usize,
    limit: usize,
    stored_hooks: Vec<Box<dyn Fn(&str)>>,
    restored_hooks: Vec<Box<dyn Fn(&str)>>,
}

impl Default for SceneHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneHistory {
    pub fn new() -> Self {
        Self::with_limit(HISTORY_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            stamps: Vec::new(),
            current: 0,
            limit: limit.max(1),
            stored_hooks: Vec::new(),
            restored_hooks: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    /// Description of the stamp under the cursor.
    pub fn current_description(&self) -> Option<&str> {
        self.stamps.get(self.current).map(|s| s.description.as_str())
    }

    pub fn can_undo(&self) -> bool {
        self.current > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current + 1 < self.stamps.len()
    }

    /// Fired after every [`SceneHistory::store`] with the stamp description.
    pub fn on_stored(&mut self, f: impl Fn(&str) + 'static) {
        self.stored_hooks.push(Box::new(f));
    }

    /// Fired after every successful undo/redo with the restored stamp's
    /// description.
    pub fn on_restored(&mut self, f: impl Fn(&str) + 'static) {
        self.restored_hooks.push(Box::new(f));
    }

    /// Record a new stamp of the scene's current state.
    ///
    /// Any redo branch beyond the cursor is discarded first (a fresh edit
    /// makes redoing impossible). When the stack is full the oldest stamp
    /// is dropped and the cursor decremented to compensate.
    pub fn store(&mut self, scene: &mut Scene, description: &str, set_modified: bool) {
        if self.can_redo() {
            self.stamps.truncate(self.current + 1);
        }
        if self.stamps.len() >= self.limit {
            self.stamps.remove(0);
            self.current = self.current.saturating_sub(1);
        }
        debug!(description, "storing history stamp");
        self.stamps.push(HistoryStamp {
            description: description.to_owned(),
            snapshot: scene.snapshot(),
            selected_nodes: scene.selected_nodes(),
            selected_edges: scene.selected_edges(),
        });
        self.current = self.stamps.len() - 1;
        if set_modified {
            scene.set_modified(true);
        }
        for f in &self.stored_hooks {
            f(description);
        }
    }

    /// Step one stamp back and restore it. `None` when already at the
    /// baseline.
    pub fn undo(&mut self, scene: &mut Scene) -> Option<RestoreReport> {
        if !self.can_undo() {
            return None;
        }
        self.current -= 1;
        Some(self.restore_current(scene))
    }

    /// Step one stamp forward and restore it. `None` when no redo branch
    /// exists.
    pub fn redo(&mut self, scene: &mut Scene) -> Option<RestoreReport> {
        if !self.can_redo() {
            return None;
        }
        self.current += 1;
        Some(self.restore_current(scene))
    }

    /// Restore the stamp under the cursor into the scene.
    ///
    /// Best-effort: entities that cannot be reconstructed are logged and
    /// skipped inside the snapshot application, never fatal. The stamp's
    /// recorded selection is re-applied afterwards, ignoring IDs that no
    /// longer exist.
    fn restore_current(&self, scene: &mut Scene) -> RestoreReport {
        let stamp = &self.stamps[self.current];
        let before = scene.selected_items();

        scene.silent_selection_events = true;
        let mut id_map = IdMap::new();
        scene.apply_snapshot(&stamp.snapshot, true, &mut id_map);
        scene.deselect_all(true);
        for id in &stamp.selected_nodes {
            scene.select_node(id);
        }
        for id in &stamp.selected_edges {
            scene.select_edge(id);
        }
        scene.poll_selection_change();
        scene.silent_selection_events = false;

        for f in &self.restored_hooks {
            f(&stamp.description);
        }
        RestoreReport {
            selection_changed: scene.selected_items() != before,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::EdgeStyle;
    use crate::id::IdGenerator;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn scene_with_baseline(history: &mut SceneHistory) -> Scene {
        let mut scene = Scene::with_generator(IdGenerator::with_seed(500));
        history.store(&mut scene, "Initial History Stamp", false);
        scene
    }

    // ========================================================================
    // Linearity
    // ========================================================================

    #[test]
    fn test_undo_redo_linearity() {
        let mut history = SceneHistory::new();
        let mut scene = scene_with_baseline(&mut history);
        let n = 4;
        for i in 0..n {
            scene.create_node(format!("node {i}"), 0, &[1], &[1]);
            history.store(&mut scene, "Added node", true);
        }
        assert!(history.can_undo());
        assert!(!history.can_redo());

        for _ in 0..n {
            assert!(history.undo(&mut scene).is_some());
        }
        assert!(!history.can_undo());
        assert!(scene.nodes().is_empty());
        assert!(history.undo(&mut scene).is_none());

        for _ in 0..n {
            assert!(history.redo(&mut scene).is_some());
        }
        assert!(!history.can_redo());
        assert_eq!(scene.nodes().len(), n);
    }

    #[test]
    fn test_redo_restores_exact_snapshot() {
        let mut history = SceneHistory::new();
        let mut scene = scene_with_baseline(&mut history);
        let a = scene.create_node("a", 0, &[], &[1]);
        let b = scene.create_node("b", 0, &[1], &[]);
        scene.move_node(&a, 10.0, 20.0);
        scene.move_node(&b, 300.0, 40.0);
        let out = scene.node(&a).unwrap().output(0).unwrap().id().clone();
        let inp = scene.node(&b).unwrap().input(0).unwrap().id().clone();
        scene.connect(&out, Some(&inp), EdgeStyle::Square).unwrap();
        history.store(&mut scene, "Wired", true);

        history.undo(&mut scene);
        assert!(scene.nodes().is_empty());
        history.redo(&mut scene);
        assert_eq!(scene.nodes().len(), 2);
        assert_eq!(scene.edges().len(), 1);
        assert_eq!(scene.node(&a).unwrap().position(), (10.0, 20.0));
        assert_eq!(scene.edges()[0].style, EdgeStyle::Square);
        assert!(scene.socket(&out).unwrap().has_edge(scene.edges()[0].id()));
    }

    // ========================================================================
    // Branch truncation and depth cap
    // ========================================================================

    #[test]
    fn test_fresh_edit_discards_redo_branch() {
        let mut history = SceneHistory::new();
        let mut scene = scene_with_baseline(&mut history);
        scene.create_node("a", 0, &[], &[]);
        history.store(&mut scene, "Added a", true);
        scene.create_node("b", 0, &[], &[]);
        history.store(&mut scene, "Added b", true);

        history.undo(&mut scene);
        assert!(history.can_redo());
        scene.create_node("c", 0, &[], &[]);
        history.store(&mut scene, "Added c", true);
        assert!(!history.can_redo());
        assert_eq!(history.len(), 3);
        assert_eq!(history.current_description(), Some("Added c"));
    }

    #[test]
    fn test_depth_cap_drops_oldest_and_keeps_undo_working() {
        let mut history = SceneHistory::with_limit(3);
        let mut scene = scene_with_baseline(&mut history);
        for i in 0..5 {
            scene.create_node(format!("n{i}"), 0, &[], &[]);
            history.store(&mut scene, "Added", true);
        }
        assert_eq!(history.len(), 3);
        // Cursor was decremented with each drop, so exactly two undos
        // remain.
        assert!(history.undo(&mut scene).is_some());
        assert!(history.undo(&mut scene).is_some());
        assert!(!history.can_undo());
        // The oldest surviving stamp has 3 nodes.
        assert_eq!(scene.nodes().len(), 3);
    }

    // ========================================================================
    // Selection restore
    // ========================================================================

    #[test]
    fn test_restore_reapplies_recorded_selection() {
        let mut history = SceneHistory::new();
        let mut scene = scene_with_baseline(&mut history);
        let a = scene.create_node("a", 0, &[], &[]);
        scene.select_node(&a);
        scene.poll_selection_change();
        history.store(&mut scene, "Selected a", false);
        scene.deselect_all(false);
        scene.poll_selection_change();

        let report = history.undo(&mut scene).unwrap();
        // Baseline had no selection and current selection is empty too.
        assert!(!report.selection_changed);
        let report = history.redo(&mut scene).unwrap();
        assert!(report.selection_changed);
        assert_eq!(scene.selected_nodes(), vec![a]);
    }

    #[test]
    fn test_restore_ignores_vanished_selection_ids() {
        let mut history = SceneHistory::new();
        let mut scene = scene_with_baseline(&mut history);
        let a = scene.create_node("a", 0, &[], &[]);
        scene.select_node(&a);
        history.store(&mut scene, "Selected a", false);
        // Tamper: the stamp references a node that no longer exists after
        // restoring the baseline, then redoing onto a scene where the node
        // was never rebuilt is still safe.
        history.undo(&mut scene);
        assert!(scene.selected_nodes().is_empty());
        history.redo(&mut scene);
        assert_eq!(scene.selected_nodes(), vec![a]);
    }

    #[test]
    fn test_store_fires_hooks_and_sets_modified() {
        let mut history = SceneHistory::new();
        let mut scene = Scene::with_generator(IdGenerator::with_seed(501));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        history.on_stored(move |desc| s.borrow_mut().push(desc.to_owned()));
        history.store(&mut scene, "Initial History Stamp", false);
        assert!(!scene.is_modified());
        history.store(&mut scene, "Edit", true);
        assert!(scene.is_modified());
        assert_eq!(*seen.borrow(), vec!["Initial History Stamp", "Edit"]);
    }
}
