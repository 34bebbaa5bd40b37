//! Level 4: Persistence and clipboard interchange.
//!
//! File round-trips, the load error taxonomy, legacy migration and moving
//! clipboard payloads between documents as JSON.

mod common;

use common::harness::EditorHarness;
use flowgraph::{
    copy_selection, paste, ClipboardPayload, EdgeStyle, PersistError, FILE_VERSION,
};
use serde_json::Value;
use std::fs;

#[test]
fn test_editor_save_load_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("document.json");

    let mut harness = EditorHarness::new();
    let (_, out) = harness.add_source("Source", (10.0, 20.0));
    let (_, inp) = harness.add_sink("Sink", (500.0, 40.0));
    let edge = harness.wire(&out, &inp);
    harness
        .editor
        .scene_mut()
        .set_edge_style(&edge, EdgeStyle::ImprovedSharp);
    harness.editor.save(&path).unwrap();
    assert!(!harness.editor.scene().is_modified());

    let mut other = EditorHarness::with_seed(99);
    other.editor.load(&path).unwrap();
    let scene = other.editor.scene();
    assert_eq!(scene.nodes().len(), 2);
    assert_eq!(scene.edges().len(), 1);
    assert_eq!(scene.edge(&edge).unwrap().style, EdgeStyle::ImprovedSharp);
    assert_eq!(scene.id(), harness.editor.scene().id());
    // Loading restarts history with a fresh baseline.
    assert!(!other.editor.can_undo());
}

#[test]
fn test_saved_file_is_versioned_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("document.json");
    let mut harness = EditorHarness::new();
    harness.add_source("Source", (0.0, 0.0));
    harness.editor.save(&path).unwrap();

    let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["version"], FILE_VERSION);
    assert!(value["nodes"].is_array());
    assert!(value["edges"].is_array());
    assert!(value["sid"].is_string());
}

#[test]
fn test_load_error_taxonomy() {
    let dir = tempfile::tempdir().unwrap();
    let mut harness = EditorHarness::new();

    let missing = dir.path().join("missing.json");
    assert!(matches!(
        harness.editor.load(&missing),
        Err(PersistError::NotFound(_))
    ));

    let garbage = dir.path().join("garbage.json");
    fs::write(&garbage, "not json at all").unwrap();
    assert!(matches!(
        harness.editor.load(&garbage),
        Err(PersistError::InvalidFile { .. })
    ));

    let array = dir.path().join("array.json");
    fs::write(&array, "[]").unwrap();
    let err = harness.editor.load(&array).unwrap_err();
    // The error names the offending file for the host's dialog.
    assert!(err.to_string().contains("array.json"));
}

#[test]
fn test_legacy_unversioned_file_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.json");

    let mut harness = EditorHarness::new();
    harness.add_source("Source", (0.0, 0.0));
    let mut value = serde_json::to_value(harness.editor.scene().snapshot()).unwrap();
    value.as_object_mut().unwrap().remove("version");
    fs::write(&path, value.to_string()).unwrap();

    let mut other = EditorHarness::with_seed(7);
    other.editor.load(&path).unwrap();
    assert_eq!(other.editor.scene().nodes().len(), 1);
}

#[test]
fn test_clipboard_payload_travels_as_json() {
    let mut harness = EditorHarness::new();
    let (a, out) = harness.add_source("Source", (0.0, 0.0));
    let (b, inp) = harness.add_sink("Sink", (400.0, 0.0));
    let edge = harness.wire(&out, &inp);
    let scene = harness.editor.scene_mut();
    scene.select_node(&a);
    scene.select_node(&b);
    scene.select_edge(&edge);

    // Simulate a system clipboard: serialize in one document, paste into
    // another.
    let json = serde_json::to_string(&copy_selection(harness.editor.scene())).unwrap();
    let payload: ClipboardPayload = serde_json::from_str(&json).unwrap();

    let mut other = EditorHarness::with_seed(55);
    let created = paste(other.editor.scene_mut(), &payload, (100.0, 100.0));
    assert_eq!(created.len(), 2);
    assert_eq!(other.editor.scene().edges().len(), 1);
    // Relative layout preserved under the new reference point.
    let mut xs: Vec<f32> = created
        .iter()
        .map(|id| other.editor.scene().node(id).unwrap().position().0)
        .collect();
    xs.sort_by(f32::total_cmp);
    assert_eq!(xs, vec![100.0, 500.0]);
}

#[test]
fn test_clipboard_edge_filtering_property() {
    let mut harness = EditorHarness::new();
    let (a, out) = harness.add_source("Source", (0.0, 0.0));
    let (_, inp) = harness.add_sink("Sink", (400.0, 0.0));
    let edge = harness.wire(&out, &inp);
    let scene = harness.editor.scene_mut();
    scene.select_node(&a);
    scene.select_edge(&edge);

    // One node of a connected pair: 1 node, 0 edges.
    let payload = copy_selection(harness.editor.scene());
    assert_eq!(payload.nodes.len(), 1);
    assert_eq!(payload.edges.len(), 0);
}
