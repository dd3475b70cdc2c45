//! Source workbook discovery by file naming convention

use crate::error::{MergeError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File naming convention for source workbooks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    pub prefix: String,
    pub substring: String,
    pub extension: String,
}

impl NamePattern {
    pub fn new(prefix: &str, substring: &str, extension: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            substring: substring.to_string(),
            extension: extension.to_string(),
        }
    }

    /// Check a file name against the convention.
    ///
    /// Uses first-occurrence search: the first `prefix` must be at position 0
    /// and the first `substring` must be past position 0. `Scribe11_ADC_Analysis.xlsx`
    /// matches prefix `Scribe` and substring `Analysis`.
    pub fn matches(&self, file_name: &str) -> bool {
        file_name.ends_with(&self.extension)
            && file_name.find(&self.prefix) == Some(0)
            && file_name.find(&self.substring).is_some_and(|pos| pos > 0)
    }
}

/// Return the files in `directory` whose names match `pattern`.
///
/// The order is whatever the directory listing yields. Subdirectories are
/// not searched and names that are not valid UTF-8 are ignored.
pub fn locate(directory: &Path, pattern: &NamePattern) -> Result<Vec<PathBuf>> {
    let discovery_error = |source| MergeError::Discovery {
        dir: directory.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(directory).map_err(discovery_error)? {
        let entry = entry.map_err(discovery_error)?;
        let path = entry.path();
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if pattern.matches(&name) && path.is_file() {
            files.push(path);
        }
    }

    log::debug!(
        "Located {} workbook(s) in {} matching {}*{}*{}",
        files.len(),
        directory.display(),
        pattern.prefix,
        pattern.substring,
        pattern.extension
    );
    Ok(files)
}

/// Sort located files by file name
pub fn sort_by_name(files: &mut [PathBuf]) {
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
}
