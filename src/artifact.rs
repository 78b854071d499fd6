//! Whole-file JSON artifacts in the output directory.

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::error::{Result, SyncError};

/// Read and parse `path`. A missing file is `Ok(None)`; a file that exists
/// but does not parse is `MalformedArtifact`.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| SyncError::MalformedArtifact {
            path: path.to_path_buf(),
            source,
        })
}

/// Like [`load`], but any failure is reported and treated as absent.
pub fn load_or_absent<T: DeserializeOwned>(path: &Path) -> Option<T> {
    match load(path) {
        Ok(value) => value,
        Err(e) => {
            warn!("{e}");
            None
        }
    }
}

/// Replace `path` with the pretty JSON of `value`.
///
/// The content goes to a sibling temp file first and is renamed into place,
/// so readers never see a half-written artifact.
pub fn write<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let contents = serde_json::to_string_pretty(value)?;
    let tmp = temp_path(path);
    std::fs::write(&tmp, contents)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    #[test]
    fn test_missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: Option<Value> = load(&dir.path().join("nope.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_truncated_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        std::fs::write(&path, "{\"stories\": [").unwrap();

        assert!(matches!(
            load::<Value>(&path),
            Err(SyncError::MalformedArtifact { .. })
        ));
        assert!(load_or_absent::<Value>(&path).is_none());
    }

    #[test]
    fn test_write_replaces_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");

        write(&path, &json!({ "a": 1, "long": "x".repeat(100) })).unwrap();
        write(&path, &json!({ "a": 2 })).unwrap();

        let loaded: Value = load(&path).unwrap().unwrap();
        assert_eq!(loaded, json!({ "a": 2 }));
        assert!(!temp_path(&path).exists());
    }
}
