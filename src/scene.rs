//! The scene: owning arena for nodes and edges.
//!
//! The [`Scene`] is the sole ownership root of one graph document. Nodes own
//! their sockets; everything else is cross-referenced by ID and resolved
//! through the scene's lookup helpers, so removal is a plain, observable
//! arena operation with no hidden reference cycles.
//!
//! Edge lifecycle funnels through exactly two methods, [`Scene::connect`]
//! and [`Scene::unlink_edge`] (plus [`Scene::reattach_edge`] for rerouting):
//! these are the only places that touch both the scene edge list and the
//! sockets' edge lists, which is what keeps them consistent.

use crate::bridge::{HostBridge, NullBridge};
use crate::edge::{Edge, EdgeSnapshot, EdgeStyle};
use crate::id::{IdGenerator, Uid};
use crate::node::{Node, NodeSnapshot};
use crate::path::{calc_path, PathSegment};
use crate::socket::Socket;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;
use tracing::warn;

/// Fixed scene bounds, serialized with every snapshot.
pub const SCENE_WIDTH: f32 = 64_000.0;
pub const SCENE_HEIGHT: f32 = 64_000.0;

/// Version string written into snapshots produced by this crate.
pub const SNAPSHOT_VERSION: &str = "2.0.0";

/// Table mapping serialized `sid`s to live IDs, built up while nodes and
/// sockets are recreated and consulted to resolve edge endpoints.
pub type IdMap = HashMap<Uid, Uid>;

/// Factory invoked for incoming node records with no existing match,
/// letting the host pick a concrete node setup from the serialized data.
pub type NodeFactory = Box<dyn Fn(&NodeSnapshot, &mut IdGenerator) -> Node>;

/// Why an edge could not be created.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectError {
    #[error("unknown socket {0}")]
    UnknownSocket(Uid),
    #[error("an edge cannot connect a socket to itself")]
    SameSocket,
}

/// Options for [`Scene::unlink_edge`].
#[derive(Default)]
pub struct UnlinkOptions {
    /// Suppress all change notification for this removal.
    pub silent: bool,
    /// Exempt exactly one socket's owning node from notification (used
    /// while that socket's node is being torn down).
    pub silent_for_socket: Option<Uid>,
}

/// Presentation/collaborator callbacks. All hooks default to no-ops; the
/// core never assumes anything about how repainting happens. Hooks receive
/// plain IDs and values, never references into the arena.
#[derive(Default)]
pub struct SceneHooks {
    modified: Vec<Box<dyn Fn(bool)>>,
    item_selected: Vec<Box<dyn Fn()>>,
    items_deselected: Vec<Box<dyn Fn()>>,
    edge_path_changed: Vec<Box<dyn Fn(&Uid)>>,
    node_moved: Vec<Box<dyn Fn(&Uid, f32, f32)>>,
    input_changed: Vec<Box<dyn Fn(&Uid, &Uid)>>,
}

/// Outcome of a value-based selection-change poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionChange {
    /// True when the new selection is empty.
    pub deselected_everything: bool,
}

/// The owning container of all nodes and edges plus selection and
/// modification state for one graph document.
pub struct Scene {
    id: Uid,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    pub width: f32,
    pub height: f32,
    modified: bool,
    selected_nodes: HashSet<Uid>,
    selected_edges: HashSet<Uid>,
    /// Digest of the last observed selection, for value-based change
    /// detection.
    last_selection: Vec<Uid>,
    /// Batch operations (paste, restore) set this to mutate selection
    /// without firing change notifications.
    pub silent_selection_events: bool,
    hooks: SceneHooks,
    gen: IdGenerator,
    node_factory: Option<NodeFactory>,
    bridge: Box<dyn HostBridge>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::with_generator(IdGenerator::new())
    }

    /// Create a scene with an explicit (e.g. seeded) identifier generator.
    pub fn with_generator(mut gen: IdGenerator) -> Self {
        Self {
            id: gen.generate(),
            nodes: Vec::new(),
            edges: Vec::new(),
            width: SCENE_WIDTH,
            height: SCENE_HEIGHT,
            modified: false,
            selected_nodes: HashSet::new(),
            selected_edges: HashSet::new(),
            last_selection: Vec::new(),
            silent_selection_events: false,
            hooks: SceneHooks::default(),
            gen,
            node_factory: None,
            bridge: Box::new(NullBridge),
        }
    }

    pub fn id(&self) -> &Uid {
        &self.id
    }

    pub fn generator_mut(&mut self) -> &mut IdGenerator {
        &mut self.gen
    }

    /// Install the factory used to pick concrete node setups during
    /// deserialization.
    pub fn set_node_factory(&mut self, factory: NodeFactory) {
        self.node_factory = Some(factory);
    }

    // ------------------------------------------------------------------
    // Host bridge
    // ------------------------------------------------------------------

    pub fn set_bridge(&mut self, bridge: Box<dyn HostBridge>) {
        self.bridge = bridge;
    }

    pub fn bridge(&self) -> &dyn HostBridge {
        self.bridge.as_ref()
    }

    pub fn bridge_mut(&mut self) -> &mut dyn HostBridge {
        self.bridge.as_mut()
    }

    // ------------------------------------------------------------------
    // Hooks
    // ------------------------------------------------------------------

    pub fn on_modified(&mut self, f: impl Fn(bool) + 'static) {
        self.hooks.modified.push(Box::new(f));
    }

    pub fn on_item_selected(&mut self, f: impl Fn() + 'static) {
        self.hooks.item_selected.push(Box::new(f));
    }

    pub fn on_items_deselected(&mut self, f: impl Fn() + 'static) {
        self.hooks.items_deselected.push(Box::new(f));
    }

    /// Fired whenever an edge's path must be recomputed (endpoint moved,
    /// style changed, edge created or reattached).
    pub fn on_edge_path_changed(&mut self, f: impl Fn(&Uid) + 'static) {
        self.hooks.edge_path_changed.push(Box::new(f));
    }

    pub fn on_node_moved(&mut self, f: impl Fn(&Uid, f32, f32) + 'static) {
        self.hooks.node_moved.push(Box::new(f));
    }

    /// Fired with `(node_id, socket_id)` when an input socket's connection
    /// set changes.
    pub fn on_input_changed(&mut self, f: impl Fn(&Uid, &Uid) + 'static) {
        self.hooks.input_changed.push(Box::new(f));
    }

    fn notify_edge_path(&self, edge: &Uid) {
        for f in &self.hooks.edge_path_changed {
            f(edge);
        }
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &Uid) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    pub fn node_mut(&mut self, id: &Uid) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id() == id)
    }

    pub fn edge(&self, id: &Uid) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id() == id)
    }

    pub fn edge_mut(&mut self, id: &Uid) -> Option<&mut Edge> {
        self.edges.iter_mut().find(|e| e.id() == id)
    }

    pub fn socket(&self, id: &Uid) -> Option<&Socket> {
        self.nodes.iter().find_map(|n| n.socket(id))
    }

    /// The node owning a socket.
    pub fn socket_owner(&self, socket: &Uid) -> Option<&Node> {
        self.nodes.iter().find(|n| n.socket(socket).is_some())
    }

    /// Absolute scene position of a socket's center.
    pub fn socket_position(&self, socket: &Uid) -> Option<(f32, f32)> {
        let node = self.socket_owner(socket)?;
        let offset = self.socket(socket)?.offset();
        Some((node.x + offset.0, node.y + offset.1))
    }

    /// All socket IDs in the scene with their absolute positions.
    pub fn socket_positions(&self) -> impl Iterator<Item = (&Uid, (f32, f32))> {
        self.nodes.iter().flat_map(|node| {
            node.sockets().map(move |s| {
                let (ox, oy) = s.offset();
                (s.id(), (node.x + ox, node.y + oy))
            })
        })
    }

    // ------------------------------------------------------------------
    // Node membership
    // ------------------------------------------------------------------

    /// Convenience constructor: build a node with the given socket type
    /// tags and add it to the scene.
    pub fn create_node(
        &mut self,
        title: impl Into<String>,
        op_code: u32,
        input_tags: &[i32],
        output_tags: &[i32],
    ) -> Uid {
        let mut node = Node::new(&mut self.gen, title, op_code);
        node.init_sockets(&mut self.gen, input_tags, output_tags, true);
        self.insert_node(node)
    }

    /// Add an already-built node. Plain membership; no cascading effects.
    pub fn insert_node(&mut self, node: Node) -> Uid {
        let id = node.id().clone();
        self.nodes.push(node);
        id
    }

    /// Remove a node, cascading to every edge touching any of its sockets.
    ///
    /// The dying node itself is exempted from change notification; nodes on
    /// the other end of removed edges are notified normally.
    pub fn remove_node(&mut self, id: &Uid) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        let socket_edges: Vec<(Uid, Uid)> = node
            .sockets()
            .flat_map(|s| s.edges().iter().map(|e| (s.id().clone(), e.clone())))
            .collect();
        for (socket, edge) in socket_edges {
            self.unlink_edge(
                &edge,
                UnlinkOptions {
                    silent: false,
                    silent_for_socket: Some(socket),
                },
            );
        }
        self.selected_nodes.remove(id);
        self.nodes.retain(|n| n.id() != id);
        true
    }

    /// Update a node's position, notifying movement and path hooks once.
    pub fn move_node(&mut self, id: &Uid, x: f32, y: f32) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        node.set_position(x, y);
        let touched: Vec<Uid> = self
            .node(id)
            .map(|n| {
                n.sockets()
                    .flat_map(|s| s.edges().iter().cloned())
                    .collect()
            })
            .unwrap_or_default();
        for f in &self.hooks.node_moved {
            f(id, x, y);
        }
        for edge in &touched {
            self.notify_edge_path(edge);
        }
        true
    }

    /// Remove every node (cascading to all edges) and reset the modified
    /// flag.
    pub fn clear(&mut self) {
        while let Some(first) = self.nodes.first().map(|n| n.id().clone()) {
            self.remove_node(&first);
        }
        self.selected_nodes.clear();
        self.selected_edges.clear();
        self.last_selection.clear();
        self.modified = false;
    }

    // ------------------------------------------------------------------
    // Edge lifecycle funnel
    // ------------------------------------------------------------------

    /// Create an edge between two sockets (the destination may be absent
    /// while dragging). Registers the edge with the scene and with both
    /// sockets, then requests an initial path computation.
    ///
    /// Validation is *not* applied here; interaction tools run their
    /// validator chain before committing a connection.
    pub fn connect(
        &mut self,
        start: &Uid,
        end: Option<&Uid>,
        style: EdgeStyle,
    ) -> Result<Uid, ConnectError> {
        if self.socket(start).is_none() {
            return Err(ConnectError::UnknownSocket(start.clone()));
        }
        if let Some(end) = end {
            if end == start {
                return Err(ConnectError::SameSocket);
            }
            if self.socket(end).is_none() {
                return Err(ConnectError::UnknownSocket(end.clone()));
            }
        }
        let id = self.gen.generate();
        let edge = Edge::new(id.clone(), Some(start.clone()), end.cloned(), style);
        self.edges.push(edge);
        self.attach_to_socket(start, &id);
        if let Some(end) = end {
            self.attach_to_socket(end, &id);
        }
        self.notify_edge_path(&id);
        Ok(id)
    }

    /// Remove an edge: detach from both sockets, drop it from the arena,
    /// then notify the formerly-connected nodes (unless silenced).
    pub fn unlink_edge(&mut self, id: &Uid, options: UnlinkOptions) -> bool {
        let Some(position) = self.edges.iter().position(|e| e.id() == id) else {
            return false;
        };
        let edge = self.edges.remove(position);
        self.selected_edges.remove(id);

        let endpoints: Vec<Uid> = [edge.start(), edge.end()]
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        for socket in &endpoints {
            self.detach_from_socket(socket, id);
        }
        if options.silent {
            return true;
        }
        for socket in &endpoints {
            if options.silent_for_socket.as_ref() == Some(socket) {
                continue;
            }
            self.notify_connection_changed(socket);
        }
        true
    }

    /// Shorthand for [`Scene::unlink_edge`] with default options.
    pub fn remove_edge(&mut self, id: &Uid) -> bool {
        self.unlink_edge(id, UnlinkOptions::default())
    }

    /// Move one endpoint of an existing edge from `from` to `to`, keeping
    /// the edge object (and its identity) alive. Part of the lifecycle
    /// funnel; used by the rerouting tool.
    pub fn reattach_edge(&mut self, edge_id: &Uid, from: &Uid, to: &Uid) -> bool {
        if self.socket(to).is_none() {
            return false;
        }
        let Some(edge) = self.edge_mut(edge_id) else {
            return false;
        };
        if edge.start.as_ref() == Some(from) {
            edge.start = Some(to.clone());
        } else if edge.end.as_ref() == Some(from) {
            edge.end = Some(to.clone());
        } else {
            return false;
        }
        let edge_id = edge_id.clone();
        self.detach_from_socket(from, &edge_id);
        self.attach_to_socket(to, &edge_id);
        self.notify_connection_changed(from);
        self.notify_connection_changed(to);
        self.notify_edge_path(&edge_id);
        true
    }

    /// Change an edge's path style and request a path recompute.
    pub fn set_edge_style(&mut self, id: &Uid, style: EdgeStyle) -> bool {
        let Some(edge) = self.edge_mut(id) else {
            return false;
        };
        edge.style = style;
        self.notify_edge_path(id);
        true
    }

    /// Compute the drawable path of an edge from its endpoint sockets.
    ///
    /// `dest_override` substitutes the destination position (and removes
    /// the destination side) for edges that are still being dragged.
    pub fn edge_path(
        &self,
        id: &Uid,
        dest_override: Option<(f32, f32)>,
    ) -> Option<Vec<PathSegment>> {
        let edge = self.edge(id)?;
        let start = edge.start()?;
        let source = self.socket_position(start)?;
        let source_side = self.socket(start)?.side;
        let (dest, dest_side) = match (edge.end(), dest_override) {
            (_, Some(pos)) => (pos, None),
            (Some(end), None) => (self.socket_position(end)?, Some(self.socket(end)?.side)),
            (None, None) => return None,
        };
        Some(calc_path(edge.style, source, dest, source_side, dest_side))
    }

    fn attach_to_socket(&mut self, socket: &Uid, edge: &Uid) {
        for node in &mut self.nodes {
            if let Some(s) = node.socket_mut(socket) {
                s.add_edge(edge.clone());
                return;
            }
        }
    }

    fn detach_from_socket(&mut self, socket: &Uid, edge: &Uid) {
        for node in &mut self.nodes {
            if let Some(s) = node.socket_mut(socket) {
                s.remove_edge(edge);
                return;
            }
        }
    }

    /// Notify a node that one of its sockets gained or lost an edge. For
    /// input sockets this marks the node and its descendants dirty, which
    /// is what drives lazy re-evaluation.
    fn notify_connection_changed(&mut self, socket: &Uid) {
        let Some((node_id, is_input)) = self.socket_owner(socket).map(|n| {
            let is_input = n
                .socket(socket)
                .map(|s| s.direction == crate::socket::SocketDirection::Input)
                .unwrap_or(false);
            (n.id().clone(), is_input)
        }) else {
            return;
        };
        if is_input {
            if let Some(node) = self.node_mut(&node_id) {
                node.mark_dirty(true);
            }
            self.mark_descendants_dirty(&node_id);
            for f in &self.hooks.input_changed {
                f(&node_id, socket);
            }
        }
    }

    // ------------------------------------------------------------------
    // Dataflow traversal
    // ------------------------------------------------------------------

    /// Nodes reachable from `id` through one hop of its output edges.
    pub fn children_of(&self, id: &Uid) -> Vec<Uid> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        let mut children = Vec::new();
        for socket in node.outputs() {
            for edge_id in socket.edges() {
                let Some(edge) = self.edge(edge_id) else {
                    continue;
                };
                let Some(other) = edge.other_end(socket.id()) else {
                    continue;
                };
                if let Some(owner) = self.socket_owner(other) {
                    let owner = owner.id().clone();
                    if !children.contains(&owner) {
                        children.push(owner);
                    }
                }
            }
        }
        children
    }

    /// Mark every node reachable via output edges dirty.
    ///
    /// Iterative breadth-first walk with a visited set keyed by node ID, so
    /// it terminates on cyclic graphs and visits diamonds once.
    pub fn mark_descendants_dirty(&mut self, id: &Uid) {
        self.walk_descendants(id, |node| node.mark_dirty(true));
    }

    /// Mark every node reachable via output edges invalid.
    pub fn mark_descendants_invalid(&mut self, id: &Uid) {
        self.walk_descendants(id, |node| node.mark_invalid(true));
    }

    fn walk_descendants(&mut self, id: &Uid, apply: impl Fn(&mut Node)) {
        let mut visited: HashSet<Uid> = HashSet::new();
        visited.insert(id.clone());
        let mut queue: VecDeque<Uid> = self.children_of(id).into();
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(node) = self.node_mut(&current) {
                apply(node);
            }
            for child in self.children_of(&current) {
                if !visited.contains(&child) {
                    queue.push_back(child);
                }
            }
        }
    }

    /// Resolve the node feeding input socket `index` of `id`, if any.
    pub fn input_source(&self, id: &Uid, index: usize) -> Option<Uid> {
        let node = self.node(id)?;
        let socket = node.input(index)?;
        let edge = self.edge(socket.edges().first()?)?;
        let other = edge.other_end(socket.id())?;
        self.socket_owner(other).map(|n| n.id().clone())
    }

    // ------------------------------------------------------------------
    // Modified flag
    // ------------------------------------------------------------------

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Set the modified flag. Listeners fire only on the false→true
    /// transition, i.e. the first modification since the last save.
    pub fn set_modified(&mut self, value: bool) {
        let first_modification = !self.modified && value;
        self.modified = value;
        if first_modification {
            for f in &self.hooks.modified {
                f(true);
            }
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn select_node(&mut self, id: &Uid) -> bool {
        if self.node(id).is_some() {
            self.selected_nodes.insert(id.clone())
        } else {
            false
        }
    }

    /// Select an edge. Provisional edges are unselectable.
    pub fn select_edge(&mut self, id: &Uid) -> bool {
        match self.edge(id) {
            Some(edge) if !edge.provisional => self.selected_edges.insert(id.clone()),
            _ => false,
        }
    }

    pub fn deselect_node(&mut self, id: &Uid) -> bool {
        self.selected_nodes.remove(id)
    }

    pub fn deselect_edge(&mut self, id: &Uid) -> bool {
        self.selected_edges.remove(id)
    }

    pub fn is_selected(&self, id: &Uid) -> bool {
        self.selected_nodes.contains(id) || self.selected_edges.contains(id)
    }

    /// Clear all selection flags. With `silent` the deselection listeners
    /// stay quiet and the change is absorbed into the digest immediately.
    pub fn deselect_all(&mut self, silent: bool) {
        self.selected_nodes.clear();
        self.selected_edges.clear();
        if silent {
            self.last_selection.clear();
        }
    }

    /// Selected node IDs, sorted for determinism.
    pub fn selected_nodes(&self) -> Vec<Uid> {
        let mut ids: Vec<Uid> = self.selected_nodes.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Selected edge IDs, sorted for determinism.
    pub fn selected_edges(&self) -> Vec<Uid> {
        let mut ids: Vec<Uid> = self.selected_edges.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// All selected item IDs (nodes then edges).
    pub fn selected_items(&self) -> Vec<Uid> {
        let mut items = self.selected_nodes();
        items.extend(self.selected_edges());
        items
    }

    /// Value-based selection-change detection: compare the current selected
    /// item list against the last observed one. When they differ, update
    /// the record, fire the selection hooks (unless in silent mode) and
    /// report the change. Event origin is irrelevant; only the value
    /// matters.
    pub fn poll_selection_change(&mut self) -> Option<SelectionChange> {
        let current = self.selected_items();
        if current == self.last_selection {
            return None;
        }
        self.last_selection = current.clone();
        let deselected_everything = current.is_empty();
        if !self.silent_selection_events {
            if deselected_everything {
                for f in &self.hooks.items_deselected {
                    f();
                }
            } else {
                for f in &self.hooks.item_selected {
                    f();
                }
            }
        }
        Some(SelectionChange {
            deselected_everything,
        })
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Serialize the whole scene. Provisional edges (drag previews) are
    /// excluded.
    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            version: Some(SNAPSHOT_VERSION.to_owned()),
            sid: self.id.clone(),
            scene_width: self.width,
            scene_height: self.height,
            nodes: self.nodes.iter().map(Node::snapshot).collect(),
            edges: self
                .edges
                .iter()
                .filter(|e| !e.provisional)
                .map(Edge::snapshot)
                .collect(),
        }
    }

    /// Deserialize a snapshot into this scene, reconciling in place.
    ///
    /// Existing nodes and edges whose ID matches an incoming record are
    /// updated through their own snapshot application; records with no
    /// match are newly constructed (through the node factory when one is
    /// installed); existing entities with no incoming record are removed.
    /// Reusing objects across restores is what keeps undo/redo visually
    /// stable.
    ///
    /// With `restore_id = false` every incoming record is treated as new
    /// and minted a fresh ID (paste semantics); nothing is removed.
    /// Unresolvable edge endpoints are logged and skipped, never fatal.
    pub fn apply_snapshot(&mut self, snap: &SceneSnapshot, restore_id: bool, id_map: &mut IdMap) {
        if restore_id {
            self.id = snap.sid.clone();
        }
        self.width = snap.scene_width;
        self.height = snap.scene_height;

        // Nodes first: update matches in place, build the rest.
        if restore_id {
            let incoming: HashSet<&Uid> = snap.nodes.iter().map(|n| &n.sid).collect();
            let stale: Vec<Uid> = self
                .nodes
                .iter()
                .map(|n| n.id().clone())
                .filter(|id| !incoming.contains(id))
                .collect();
            for id in stale {
                self.remove_node(&id);
            }
        }
        for node_snap in &snap.nodes {
            let matched = restore_id
                .then(|| self.nodes.iter().position(|n| n.id() == &node_snap.sid))
                .flatten();
            if let Some(pos) = matched {
                // Split borrow: generator and node list live in the same
                // struct, so route through a temporary take.
                let mut node = self.nodes.remove(pos);
                node.apply_snapshot(node_snap, restore_id, &mut self.gen, id_map);
                self.nodes.push(node);
            } else {
                self.build_node(node_snap, restore_id, id_map);
            }
        }

        // Socket edge lists are rebuilt from scratch by the edge pass.
        if restore_id {
            for node in &mut self.nodes {
                for socket in node.sockets_mut() {
                    socket.clear_edges();
                }
            }

            let incoming: HashSet<&Uid> = snap.edges.iter().map(|e| &e.sid).collect();
            self.edges.retain(|e| incoming.contains(e.id()));
            let selected: Vec<Uid> = self.selected_edges.iter().cloned().collect();
            for id in selected {
                if !incoming.contains(&id) {
                    self.selected_edges.remove(&id);
                }
            }
        }

        for edge_snap in &snap.edges {
            let start = edge_snap
                .start
                .as_ref()
                .and_then(|sid| self.resolve_socket(sid, id_map));
            let end = edge_snap
                .end
                .as_ref()
                .and_then(|sid| self.resolve_socket(sid, id_map));
            if edge_snap.start.is_some() && start.is_none() {
                warn!(edge = %edge_snap.sid, "skipping edge with unresolvable start socket");
                self.edges.retain(|e| e.id() != &edge_snap.sid);
                continue;
            }
            if edge_snap.end.is_some() && end.is_none() {
                warn!(edge = %edge_snap.sid, "skipping edge with unresolvable end socket");
                self.edges.retain(|e| e.id() != &edge_snap.sid);
                continue;
            }

            let id = if restore_id {
                edge_snap.sid.clone()
            } else {
                self.gen.generate()
            };
            id_map.insert(edge_snap.sid.clone(), id.clone());

            if let Some(edge) = self.edges.iter_mut().find(|e| e.id() == &id) {
                edge.style = edge_snap.edge_type;
                edge.start = start.clone();
                edge.end = end.clone();
            } else {
                self.edges
                    .push(Edge::new(id.clone(), start.clone(), end.clone(), edge_snap.edge_type));
            }
            if let Some(socket) = &start {
                self.attach_to_socket(socket, &id);
            }
            if let Some(socket) = &end {
                self.attach_to_socket(socket, &id);
            }
            self.notify_edge_path(&id);
        }

        // Drop selection entries whose items vanished.
        let live_nodes: HashSet<Uid> = self.nodes.iter().map(|n| n.id().clone()).collect();
        self.selected_nodes.retain(|id| live_nodes.contains(id));
        let live_edges: HashSet<Uid> = self.edges.iter().map(|e| e.id().clone()).collect();
        self.selected_edges.retain(|id| live_edges.contains(id));
    }

    /// Construct a node from a serialized record (through the node factory
    /// when one is installed) and add it to the scene.
    pub fn build_node(
        &mut self,
        snap: &NodeSnapshot,
        restore_id: bool,
        id_map: &mut IdMap,
    ) -> Uid {
        let node = match &self.node_factory {
            Some(factory) => {
                let mut node = factory(snap, &mut self.gen);
                node.apply_snapshot(snap, restore_id, &mut self.gen, id_map);
                node
            }
            None => Node::from_snapshot(snap, restore_id, &mut self.gen, id_map),
        };
        self.insert_node(node)
    }

    /// Resolve a serialized socket reference: prefer the remap table, fall
    /// back to a live socket with the same ID.
    fn resolve_socket(&self, sid: &Uid, id_map: &IdMap) -> Option<Uid> {
        if let Some(mapped) = id_map.get(sid) {
            if self.socket(mapped).is_some() {
                return Some(mapped.clone());
            }
        }
        self.socket(sid).map(|s| s.id().clone())
    }
}

/// Serialized form of a whole scene. This is also the persisted file
/// format; `version` is absent in legacy files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub sid: Uid,
    pub scene_width: f32,
    pub scene_height: f32,
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn two_node_scene() -> (Scene, Uid, Uid, Uid, Uid) {
        let mut scene = Scene::with_generator(IdGenerator::with_seed(100));
        let a = scene.create_node("A", 0, &[], &[1]);
        let b = scene.create_node("B", 0, &[1], &[]);
        let out = scene.node(&a).unwrap().output(0).unwrap().id().clone();
        let inp = scene.node(&b).unwrap().input(0).unwrap().id().clone();
        (scene, a, b, out, inp)
    }

    // ========================================================================
    // Connect / unlink funnel
    // ========================================================================

    #[test]
    fn test_connect_registers_everywhere() {
        let (mut scene, _, _, out, inp) = two_node_scene();
        let edge = scene.connect(&out, Some(&inp), EdgeStyle::Bezier).unwrap();
        assert_eq!(scene.edges().len(), 1);
        assert!(scene.socket(&out).unwrap().has_edge(&edge));
        assert!(scene.socket(&inp).unwrap().has_edge(&edge));
    }

    #[test]
    fn test_connect_rejects_same_socket() {
        let (mut scene, _, _, out, _) = two_node_scene();
        assert_eq!(
            scene.connect(&out, Some(&out), EdgeStyle::Direct),
            Err(ConnectError::SameSocket)
        );
        assert!(scene.edges().is_empty());
    }

    #[test]
    fn test_connect_rejects_unknown_socket() {
        let (mut scene, _, _, out, _) = two_node_scene();
        let bogus = IdGenerator::with_seed(9).generate();
        assert!(matches!(
            scene.connect(&bogus, Some(&out), EdgeStyle::Direct),
            Err(ConnectError::UnknownSocket(_))
        ));
    }

    #[test]
    fn test_unlink_edge_detaches_both_sockets() {
        let (mut scene, _, _, out, inp) = two_node_scene();
        let edge = scene.connect(&out, Some(&inp), EdgeStyle::Bezier).unwrap();
        assert!(scene.remove_edge(&edge));
        assert!(scene.edges().is_empty());
        assert!(!scene.socket(&out).unwrap().is_connected());
        assert!(!scene.socket(&inp).unwrap().is_connected());
    }

    #[test]
    fn test_unlink_marks_downstream_dirty() {
        let (mut scene, _, b, out, inp) = two_node_scene();
        let edge = scene.connect(&out, Some(&inp), EdgeStyle::Bezier).unwrap();
        scene.node_mut(&b).unwrap().clear_flags();
        scene.remove_edge(&edge);
        assert!(scene.node(&b).unwrap().is_dirty());
    }

    #[test]
    fn test_reattach_edge_moves_endpoint() {
        let (mut scene, _, _, out, inp) = two_node_scene();
        let c = scene.create_node("C", 0, &[1], &[]);
        let inp_c = scene.node(&c).unwrap().input(0).unwrap().id().clone();
        let edge = scene.connect(&out, Some(&inp), EdgeStyle::Bezier).unwrap();
        assert!(scene.reattach_edge(&edge, &inp, &inp_c));
        assert!(!scene.socket(&inp).unwrap().is_connected());
        assert!(scene.socket(&inp_c).unwrap().has_edge(&edge));
        assert_eq!(scene.edge(&edge).unwrap().end(), Some(&inp_c));
    }

    // ========================================================================
    // Cascading delete
    // ========================================================================

    #[test]
    fn test_remove_node_cascades_to_edges() {
        let (mut scene, a, _, out, inp) = two_node_scene();
        scene.connect(&out, Some(&inp), EdgeStyle::Bezier).unwrap();
        assert!(scene.remove_node(&a));
        assert!(scene.edges().is_empty());
        assert!(!scene.socket(&inp).unwrap().is_connected());
        assert!(scene.node(&a).is_none());
    }

    #[test]
    fn test_clear_empties_everything_and_resets_modified() {
        let (mut scene, _, _, out, inp) = two_node_scene();
        scene.connect(&out, Some(&inp), EdgeStyle::Bezier).unwrap();
        scene.set_modified(true);
        scene.clear();
        assert!(scene.nodes().is_empty());
        assert!(scene.edges().is_empty());
        assert!(!scene.is_modified());
    }

    // ========================================================================
    // Modified flag
    // ========================================================================

    #[test]
    fn test_modified_fires_only_on_first_transition() {
        let mut scene = Scene::with_generator(IdGenerator::with_seed(1));
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        scene.on_modified(move |_| *c.borrow_mut() += 1);
        scene.set_modified(true);
        scene.set_modified(true);
        scene.set_modified(true);
        assert_eq!(*count.borrow(), 1);
        scene.set_modified(false);
        scene.set_modified(true);
        assert_eq!(*count.borrow(), 2);
    }

    // ========================================================================
    // Selection
    // ========================================================================

    #[test]
    fn test_selection_change_is_value_based() {
        let (mut scene, a, b, _, _) = two_node_scene();
        scene.select_node(&a);
        assert!(scene.poll_selection_change().is_some());
        // Same value again: no change reported.
        assert!(scene.poll_selection_change().is_none());
        // Replacing with an equal set is also no change.
        scene.deselect_node(&a);
        scene.select_node(&a);
        assert!(scene.poll_selection_change().is_none());
        scene.select_node(&b);
        assert!(scene.poll_selection_change().is_some());
    }

    #[test]
    fn test_deselect_everything_is_reported() {
        let (mut scene, a, _, _, _) = two_node_scene();
        scene.select_node(&a);
        scene.poll_selection_change();
        scene.deselect_all(false);
        let change = scene.poll_selection_change().unwrap();
        assert!(change.deselected_everything);
    }

    #[test]
    fn test_silent_mode_suppresses_hooks_but_not_detection() {
        let (mut scene, a, _, _, _) = two_node_scene();
        let fired = Rc::new(RefCell::new(false));
        let f = fired.clone();
        scene.on_item_selected(move || *f.borrow_mut() = true);
        scene.silent_selection_events = true;
        scene.select_node(&a);
        assert!(scene.poll_selection_change().is_some());
        assert!(!*fired.borrow());
    }

    #[test]
    fn test_provisional_edges_are_unselectable() {
        let (mut scene, _, _, out, _) = two_node_scene();
        let edge = scene.connect(&out, None, EdgeStyle::Bezier).unwrap();
        scene.edge_mut(&edge).unwrap().provisional = true;
        assert!(!scene.select_edge(&edge));
        assert!(scene.selected_edges().is_empty());
    }

    // ========================================================================
    // Snapshot round-trip and reconciliation
    // ========================================================================

    #[test]
    fn test_snapshot_roundtrip_into_fresh_scene() {
        let (mut scene, _, _, out, inp) = two_node_scene();
        scene.connect(&out, Some(&inp), EdgeStyle::Square).unwrap();
        let snap = scene.snapshot();

        let mut restored = Scene::with_generator(IdGenerator::with_seed(777));
        let mut map = IdMap::new();
        restored.apply_snapshot(&snap, true, &mut map);

        assert_eq!(restored.nodes().len(), 2);
        assert_eq!(restored.edges().len(), 1);
        assert_eq!(restored.id(), scene.id());
        let edge = &restored.edges()[0];
        assert_eq!(edge.style, EdgeStyle::Square);
        assert!(restored.socket(&out).unwrap().has_edge(edge.id()));
        assert!(restored.socket(&inp).unwrap().has_edge(edge.id()));
    }

    #[test]
    fn test_apply_snapshot_reuses_existing_nodes() {
        let (mut scene, a, _, out, inp) = two_node_scene();
        scene.connect(&out, Some(&inp), EdgeStyle::Bezier).unwrap();
        let snap = scene.snapshot();

        scene.move_node(&a, 500.0, 500.0);
        let before: Vec<Uid> = scene.nodes().iter().map(|n| n.id().clone()).collect();
        let mut map = IdMap::new();
        scene.apply_snapshot(&snap, true, &mut map);
        let after: Vec<Uid> = scene.nodes().iter().map(|n| n.id().clone()).collect();

        let mut before_sorted = before;
        before_sorted.sort();
        let mut after_sorted = after;
        after_sorted.sort();
        assert_eq!(before_sorted, after_sorted, "node identities are reused");
        assert_eq!(scene.node(&a).unwrap().position(), (0.0, 0.0));
    }

    #[test]
    fn test_apply_snapshot_removes_stale_entities() {
        let (mut scene, _, _, out, inp) = two_node_scene();
        let snap = scene.snapshot();
        // Mutate after the snapshot: extra node and edge must disappear.
        scene.connect(&out, Some(&inp), EdgeStyle::Bezier).unwrap();
        let extra = scene.create_node("extra", 0, &[], &[]);
        let mut map = IdMap::new();
        scene.apply_snapshot(&snap, true, &mut map);
        assert!(scene.node(&extra).is_none());
        assert!(scene.edges().is_empty());
    }

    #[test]
    fn test_apply_snapshot_skips_unresolvable_edges() {
        let (scene, _, _, _, _) = two_node_scene();
        let mut snap = scene.snapshot();
        let mut gen = IdGenerator::with_seed(3);
        snap.edges.push(EdgeSnapshot {
            sid: gen.generate(),
            edge_type: EdgeStyle::Direct,
            start: Some(gen.generate()),
            end: None,
        });
        let mut target = Scene::with_generator(IdGenerator::with_seed(4));
        let mut map = IdMap::new();
        target.apply_snapshot(&snap, true, &mut map);
        assert_eq!(target.nodes().len(), 2);
        assert!(target.edges().is_empty());
    }

    #[test]
    fn test_snapshot_excludes_provisional_edges() {
        let (mut scene, _, _, out, _) = two_node_scene();
        let edge = scene.connect(&out, None, EdgeStyle::Bezier).unwrap();
        scene.edge_mut(&edge).unwrap().provisional = true;
        assert!(scene.snapshot().edges.is_empty());
    }

    // ========================================================================
    // Dirty propagation
    // ========================================================================

    fn chain_scene() -> (Scene, Vec<Uid>) {
        // a -> b -> c, plus a diamond a -> d -> c.
        let mut scene = Scene::with_generator(IdGenerator::with_seed(200));
        let a = scene.create_node("a", 0, &[], &[1, 1]);
        let b = scene.create_node("b", 0, &[1], &[1]);
        let c = scene.create_node("c", 0, &[1, 1], &[]);
        let d = scene.create_node("d", 0, &[1], &[1]);
        let sock = |scene: &Scene, n: &Uid, dir_out: bool, i: usize| {
            let node = scene.node(n).unwrap();
            if dir_out {
                node.output(i).unwrap().id().clone()
            } else {
                node.input(i).unwrap().id().clone()
            }
        };
        let pairs = [
            (sock(&scene, &a, true, 0), sock(&scene, &b, false, 0)),
            (sock(&scene, &b, true, 0), sock(&scene, &c, false, 0)),
            (sock(&scene, &a, true, 1), sock(&scene, &d, false, 0)),
            (sock(&scene, &d, true, 0), sock(&scene, &c, false, 1)),
        ];
        for (s, e) in &pairs {
            scene.connect(s, Some(e), EdgeStyle::Direct).unwrap();
        }
        (scene, vec![a, b, c, d])
    }

    #[test]
    fn test_mark_descendants_dirty_reaches_all_downstream() {
        let (mut scene, ids) = chain_scene();
        for id in &ids {
            scene.node_mut(id).unwrap().clear_flags();
        }
        scene.mark_descendants_dirty(&ids[0]);
        assert!(!scene.node(&ids[0]).unwrap().is_dirty(), "start node untouched");
        assert!(scene.node(&ids[1]).unwrap().is_dirty());
        assert!(scene.node(&ids[2]).unwrap().is_dirty());
        assert!(scene.node(&ids[3]).unwrap().is_dirty());
    }

    #[test]
    fn test_descendant_walk_terminates_on_cycles() {
        let mut scene = Scene::with_generator(IdGenerator::with_seed(300));
        let a = scene.create_node("a", 0, &[1], &[1]);
        let b = scene.create_node("b", 0, &[1], &[1]);
        let a_out = scene.node(&a).unwrap().output(0).unwrap().id().clone();
        let a_in = scene.node(&a).unwrap().input(0).unwrap().id().clone();
        let b_out = scene.node(&b).unwrap().output(0).unwrap().id().clone();
        let b_in = scene.node(&b).unwrap().input(0).unwrap().id().clone();
        scene.connect(&a_out, Some(&b_in), EdgeStyle::Direct).unwrap();
        scene.connect(&b_out, Some(&a_in), EdgeStyle::Direct).unwrap();
        scene.mark_descendants_invalid(&a);
        assert!(scene.node(&b).unwrap().is_invalid());
    }

    #[test]
    fn test_children_of_deduplicates() {
        let mut scene = Scene::with_generator(IdGenerator::with_seed(400));
        let a = scene.create_node("a", 0, &[], &[1, 1]);
        let b = scene.create_node("b", 0, &[1, 1], &[]);
        let a0 = scene.node(&a).unwrap().output(0).unwrap().id().clone();
        let a1 = scene.node(&a).unwrap().output(1).unwrap().id().clone();
        let b0 = scene.node(&b).unwrap().input(0).unwrap().id().clone();
        let b1 = scene.node(&b).unwrap().input(1).unwrap().id().clone();
        scene.connect(&a0, Some(&b0), EdgeStyle::Direct).unwrap();
        scene.connect(&a1, Some(&b1), EdgeStyle::Direct).unwrap();
        assert_eq!(scene.children_of(&a), vec![b]);
    }

    // ========================================================================
    // Edge paths
    // ========================================================================

    #[test]
    fn test_style_swap_recomputes_path() {
        let (mut scene, a, b, out, inp) = two_node_scene();
        scene.move_node(&a, 0.0, 0.0);
        scene.move_node(&b, 400.0, 0.0);
        let edge = scene.connect(&out, Some(&inp), EdgeStyle::Direct).unwrap();
        let direct = scene.edge_path(&edge, None).unwrap();
        assert!(direct
            .iter()
            .all(|s| !matches!(s, PathSegment::CubicTo(..))));
        scene.set_edge_style(&edge, EdgeStyle::Bezier);
        let bezier = scene.edge_path(&edge, None).unwrap();
        assert!(bezier.iter().any(|s| matches!(s, PathSegment::CubicTo(..))));
    }

    #[test]
    fn test_edge_path_with_override_for_dangling_edge() {
        let (mut scene, _, _, out, _) = two_node_scene();
        let edge = scene.connect(&out, None, EdgeStyle::Direct).unwrap();
        assert!(scene.edge_path(&edge, None).is_none());
        let path = scene.edge_path(&edge, Some((50.0, 50.0))).unwrap();
        assert_eq!(*path.last().unwrap(), PathSegment::LineTo(50.0, 50.0));
    }
}
