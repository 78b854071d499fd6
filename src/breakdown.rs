//! Locating and loading the breakdown document to push.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::artifact;
use crate::error::{Result, SyncError};
use crate::types::Breakdown;

pub const PUSH_READY_FILE: &str = "push_ready.json";
pub const BREAKDOWN_FILE: &str = "breakdown.json";

/// Load the breakdown from `explicit` if given, else the first usable of
/// `push_ready.json` and `breakdown.json` in `output_dir`.
///
/// Returns the tree along with the path it came from.
pub fn load(explicit: Option<&Path>, output_dir: &Path) -> Result<(Breakdown, PathBuf)> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(SyncError::FileNotFound(path.to_path_buf()));
        }
        let tree = parse(path, artifact::load::<Value>(path)?)?
            .ok_or_else(|| SyncError::NoDataSource(path.to_path_buf()))?;
        return Ok((tree, path.to_path_buf()));
    }

    for name in [PUSH_READY_FILE, BREAKDOWN_FILE] {
        let path = output_dir.join(name);
        let document = match artifact::load::<Value>(&path) {
            Ok(document) => document,
            Err(e) => {
                warn!("Skipping {}: {e}", path.display());
                continue;
            }
        };
        match parse(&path, document) {
            Ok(Some(tree)) => {
                info!("Loading from {}", path.display());
                return Ok((tree, path));
            }
            Ok(None) => {}
            Err(e) => warn!("Skipping {}: {e}", path.display()),
        }
    }

    Err(SyncError::NoDataSource(output_dir.to_path_buf()))
}

/// A document without an `epics` key does not count as a breakdown.
fn parse(path: &Path, document: Option<Value>) -> Result<Option<Breakdown>> {
    let Some(document) = document.filter(|doc| doc.get("epics").is_some()) else {
        return Ok(None);
    };
    serde_json::from_value(document)
        .map(Some)
        .map_err(|source| SyncError::MalformedArtifact {
            path: path.to_path_buf(),
            source,
        })
}
