//! Saving and loading scene files.
//!
//! Persistence lives outside the scene: the host invokes these functions,
//! the scene itself performs no I/O. The file format is the JSON form of
//! [`SceneSnapshot`] with a top-level `version` string. Unversioned files
//! predate versioning and are treated as `"0.9.0"`, routed through a
//! migration hook (identity by default) before normal deserialization.

use crate::scene::{IdMap, Scene, SceneSnapshot, SNAPSHOT_VERSION};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Version written into saved files.
pub const FILE_VERSION: &str = SNAPSHOT_VERSION;
/// Version assumed for files written before versioning existed.
pub const LEGACY_VERSION: &str = "0.9.0";

/// Load failures are distinct and name the offending file; they block the
/// load and are never swallowed.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("invalid file {path}: {reason}")]
    InvalidFile { path: PathBuf, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PersistError {
    fn invalid(path: &Path, reason: impl Into<String>) -> Self {
        PersistError::InvalidFile {
            path: path.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Hook applied to a legacy file's JSON before deserialization. The
/// default is the identity function; hosts with old files to upgrade
/// replace it.
pub type MigrationHook = fn(Value) -> Value;

fn identity_migration(value: Value) -> Value {
    value
}

/// Write the scene's snapshot to `path` as pretty-printed JSON. The
/// modified flag is reset on success.
pub fn save_scene(scene: &mut Scene, path: &Path) -> Result<(), PersistError> {
    let snapshot = scene.snapshot();
    let json = serde_json::to_string_pretty(&snapshot)
        .map_err(|e| PersistError::invalid(path, e.to_string()))?;
    fs::write(path, json)?;
    scene.set_modified(false);
    info!(path = %path.display(), "scene saved");
    Ok(())
}

/// Load a scene file into `scene` with the default (identity) legacy
/// migration.
pub fn load_scene(scene: &mut Scene, path: &Path) -> Result<(), PersistError> {
    load_scene_with_migration(scene, path, identity_migration)
}

/// Load a scene file, routing legacy (unversioned or `"0.9.0"`) content
/// through `migrate` first.
pub fn load_scene_with_migration(
    scene: &mut Scene,
    path: &Path,
    migrate: MigrationHook,
) -> Result<(), PersistError> {
    if !path.exists() {
        return Err(PersistError::NotFound(path.to_owned()));
    }
    let text = fs::read_to_string(path)?;
    let mut value: Value = serde_json::from_str(&text)
        .map_err(|e| PersistError::invalid(path, format!("malformed JSON: {e}")))?;
    if !value.is_object() {
        return Err(PersistError::invalid(path, "root is not a JSON object"));
    }

    let version = value
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or(LEGACY_VERSION)
        .to_owned();
    if version == LEGACY_VERSION {
        value = migrate(value);
        if let Some(object) = value.as_object_mut() {
            object.insert("version".to_owned(), Value::String(FILE_VERSION.to_owned()));
        }
    }

    let snapshot: SceneSnapshot = serde_json::from_value(value)
        .map_err(|e| PersistError::invalid(path, e.to_string()))?;
    let mut id_map = IdMap::new();
    scene.apply_snapshot(&snapshot, true, &mut id_map);
    scene.set_modified(false);
    info!(path = %path.display(), version, "scene loaded");
    Ok(())
}
