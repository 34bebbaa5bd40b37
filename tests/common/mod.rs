//! Common test utilities for integration tests.

#![allow(dead_code)]

pub mod harness;

use flowgraph::{Scene, Uid};
use std::cell::RefCell;
use std::rc::Rc;

/// Tracks scene hook invocations for testing.
///
/// Each field records calls to the corresponding hook with their arguments.
#[derive(Default, Clone)]
pub struct HookTracker {
    /// Modified-flag transitions (fires on false→true only).
    pub modified: Rc<RefCell<Vec<bool>>>,
    /// Number of item-selected notifications.
    pub item_selected: Rc<RefCell<usize>>,
    /// Number of items-deselected notifications.
    pub items_deselected: Rc<RefCell<usize>>,
    /// Edge IDs whose path was recomputed.
    pub edge_path_changed: Rc<RefCell<Vec<Uid>>>,
    /// (node_id, x, y)
    pub node_moved: Rc<RefCell<Vec<(Uid, f32, f32)>>>,
    /// (node_id, socket_id)
    pub input_changed: Rc<RefCell<Vec<(Uid, Uid)>>>,
}

impl HookTracker {
    /// Wire every hook of `scene` into this tracker.
    pub fn install(&self, scene: &mut Scene) {
        let modified = self.modified.clone();
        scene.on_modified(move |v| modified.borrow_mut().push(v));

        let selected = self.item_selected.clone();
        scene.on_item_selected(move || *selected.borrow_mut() += 1);

        let deselected = self.items_deselected.clone();
        scene.on_items_deselected(move || *deselected.borrow_mut() += 1);

        let paths = self.edge_path_changed.clone();
        scene.on_edge_path_changed(move |id| paths.borrow_mut().push(id.clone()));

        let moved = self.node_moved.clone();
        scene.on_node_moved(move |id, x, y| moved.borrow_mut().push((id.clone(), x, y)));

        let inputs = self.input_changed.clone();
        scene.on_input_changed(move |node, socket| {
            inputs.borrow_mut().push((node.clone(), socket.clone()))
        });
    }

    pub fn clear(&self) {
        self.modified.borrow_mut().clear();
        *self.item_selected.borrow_mut() = 0;
        *self.items_deselected.borrow_mut() = 0;
        self.edge_path_changed.borrow_mut().clear();
        self.node_moved.borrow_mut().clear();
        self.input_changed.borrow_mut().clear();
    }
}
