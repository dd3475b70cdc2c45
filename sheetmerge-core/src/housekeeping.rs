//! Removal of recently written workbooks, for cleaning up after test runs

use crate::error::{MergeError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Default age limit for [`delete_recent`]
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(3600);

/// Delete files in `directory` ending with `extension` that were modified
/// within `max_age` of now. With `dry_run` nothing is removed.
///
/// Returns the affected paths in directory listing order.
pub fn delete_recent(
    directory: &Path,
    extension: &str,
    max_age: Duration,
    dry_run: bool,
) -> Result<Vec<PathBuf>> {
    let now = SystemTime::now();
    let entries = fs::read_dir(directory).map_err(|source| MergeError::Discovery {
        dir: directory.to_path_buf(),
        source,
    })?;

    let mut affected = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| MergeError::Discovery {
            dir: directory.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let is_match = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(extension));
        if !is_match || !path.is_file() {
            continue;
        }

        let modified = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .map_err(|source| MergeError::Io {
                path: path.clone(),
                source,
            })?;
        // Timestamps in the future count as recent
        let age = now.duration_since(modified).unwrap_or_default();
        if age > max_age {
            continue;
        }

        if dry_run {
            log::info!("Would delete {}", path.display());
        } else {
            fs::remove_file(&path).map_err(|source| MergeError::Io {
                path: path.clone(),
                source,
            })?;
            log::info!("Deleted {}", path.display());
        }
        affected.push(path);
    }

    Ok(affected)
}
