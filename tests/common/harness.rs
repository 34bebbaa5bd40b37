//! Test harness wrapping a [`GraphEditor`] with hook tracking and helpers
//! for building small graphs through the same interaction paths a host
//! would use.

#![allow(dead_code)]

use super::HookTracker;
use flowgraph::{GraphEditor, IdGenerator, Uid};

/// A seeded editor with every scene hook tracked.
pub struct EditorHarness {
    pub editor: GraphEditor,
    pub tracker: HookTracker,
}

impl EditorHarness {
    pub fn new() -> Self {
        Self::with_seed(4242)
    }

    pub fn with_seed(seed: u64) -> Self {
        let mut editor = GraphEditor::with_generator(IdGenerator::with_seed(seed));
        let tracker = HookTracker::default();
        tracker.install(editor.scene_mut());
        Self { editor, tracker }
    }

    /// Node with one tag-1 output at `position`. Returns (node, output).
    pub fn add_source(&mut self, title: &str, position: (f32, f32)) -> (Uid, Uid) {
        let node = self.editor.add_custom_node(title, &[], &[1]);
        self.editor.scene_mut().move_node(&node, position.0, position.1);
        let out = self.output(&node, 0);
        (node, out)
    }

    /// Node with one tag-1 input at `position`. Returns (node, input).
    pub fn add_sink(&mut self, title: &str, position: (f32, f32)) -> (Uid, Uid) {
        let node = self.editor.add_custom_node(title, &[1], &[]);
        self.editor.scene_mut().move_node(&node, position.0, position.1);
        let inp = self.input(&node, 0);
        (node, inp)
    }

    /// Node with one tag-1 input and one tag-1 output. Returns
    /// (node, input, output).
    pub fn add_pass(&mut self, title: &str, position: (f32, f32)) -> (Uid, Uid, Uid) {
        let node = self.editor.add_custom_node(title, &[1], &[1]);
        self.editor.scene_mut().move_node(&node, position.0, position.1);
        let inp = self.input(&node, 0);
        let out = self.output(&node, 0);
        (node, inp, out)
    }

    pub fn input(&self, node: &Uid, index: usize) -> Uid {
        self.editor
            .scene()
            .node(node)
            .unwrap()
            .input(index)
            .unwrap()
            .id()
            .clone()
    }

    pub fn output(&self, node: &Uid, index: usize) -> Uid {
        self.editor
            .scene()
            .node(node)
            .unwrap()
            .output(index)
            .unwrap()
            .id()
            .clone()
    }

    pub fn socket_pos(&self, socket: &Uid) -> (f32, f32) {
        self.editor.scene().socket_position(socket).unwrap()
    }

    /// Connect two sockets through the drag tool, releasing right on the
    /// target socket's center. Panics if the connection is rejected.
    pub fn wire(&mut self, from: &Uid, to: &Uid) -> Uid {
        self.try_wire(from, to)
            .expect("connection unexpectedly rejected")
    }

    /// Connect through the drag tool; `None` when validators reject the
    /// pair.
    pub fn try_wire(&mut self, from: &Uid, to: &Uid) -> Option<Uid> {
        assert!(self.editor.begin_edge_drag(from));
        let target = self.socket_pos(to);
        self.editor.drag_edge_to(target);
        self.editor.release_edge_drag(target)
    }
}
