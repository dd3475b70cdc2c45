//! Configuration for the merge pipeline

use crate::error::{MergeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Sheet names merged by default, in output order
pub const DEFAULT_CATEGORIES: [&str; 6] = ["MC", "Gain", "Offset", "DNLmn", "DNLmx", "INL"];

/// Text values read as null
pub const DEFAULT_NA_VALUES: [&str; 17] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "nan", "null",
];

/// What to do when a located workbook lacks the category sheet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPolicy {
    /// Stop the whole run
    #[default]
    Abort,
    /// Leave the category out of the destination workbook and continue
    Skip,
}

/// What to do when the destination already has a sheet with the category name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetConflict {
    #[default]
    Error,
    Replace,
}

/// Main merge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Directory scanned for source workbooks
    pub directory: PathBuf,
    /// Text a source file name must start with
    pub name_prefix: String,
    /// Text a source file name must contain after its first character
    pub name_substring: String,
    /// File extension of source workbooks, including the dot
    pub extension: String,
    /// Sheet names to merge, in output order
    pub categories: Vec<String>,
    /// Sort located files by name instead of keeping directory order
    pub sort_files: bool,
    pub on_missing: MissingPolicy,
    pub clean: CleanOptions,
    pub output: OutputOptions,
    /// Text cell values read as null
    pub na_values: Vec<String>,
}

impl MergeConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| MergeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content)
            .map_err(|e| MergeError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Check the naming convention and category list
    pub fn validate(&self) -> Result<()> {
        if self.name_prefix.is_empty() {
            return Err(MergeError::Config("name_prefix must not be empty".into()));
        }
        if self.name_substring.is_empty() {
            return Err(MergeError::Config("name_substring must not be empty".into()));
        }
        if !self.extension.starts_with('.') || self.extension.len() < 2 {
            return Err(MergeError::Config(format!(
                "extension '{}' must start with a dot",
                self.extension
            )));
        }
        for (idx, category) in self.categories.iter().enumerate() {
            if category.trim().is_empty() {
                return Err(MergeError::Config(format!("category #{} is blank", idx + 1)));
            }
            if self.categories[..idx].contains(category) {
                return Err(MergeError::Config(format!(
                    "category '{}' is listed twice",
                    category
                )));
            }
        }
        Ok(())
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            name_prefix: "Scribe".to_string(),
            name_substring: "Analysis".to_string(),
            extension: ".xlsx".to_string(),
            categories: DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            sort_files: false,
            on_missing: MissingPolicy::default(),
            clean: CleanOptions::default(),
            output: OutputOptions::default(),
            na_values: DEFAULT_NA_VALUES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Thresholds for sparse row/column removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanOptions {
    /// Drop rows with fewer non-null cells than `min_row_values`
    pub drop_sparse_rows: bool,
    pub min_row_values: usize,
    /// Columns with fewer non-null cells are always dropped
    pub min_column_values: usize,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            drop_sparse_rows: true,
            min_row_values: 2,
            min_column_values: 2,
        }
    }
}

/// How merged tables are written to the destination workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Write row labels as the leading column
    pub write_index: bool,
    pub if_sheet_exists: SheetConflict,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self::new(true, SheetConflict::Error)
    }
}

impl OutputOptions {
    pub fn new(write_index: bool, if_sheet_exists: SheetConflict) -> Self {
        Self {
            write_index,
            if_sheet_exists,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MergeConfig::default();
        assert_eq!(config.categories, DEFAULT_CATEGORIES);
        assert_eq!(config.clean.min_row_values, 2);
        assert_eq!(config.clean.min_column_values, 2);
        assert!(config.clean.drop_sparse_rows);
        assert_eq!(config.on_missing, MissingPolicy::Abort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config: MergeConfig = toml::from_str(
            r#"
            name_prefix = "Die"
            categories = ["Gain"]
            on_missing = "skip"

            [clean]
            min_column_values = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.name_prefix, "Die");
        assert_eq!(config.name_substring, "Analysis");
        assert_eq!(config.categories, vec!["Gain".to_string()]);
        assert_eq!(config.on_missing, MissingPolicy::Skip);
        assert_eq!(config.clean.min_column_values, 3);
        assert_eq!(config.clean.min_row_values, 2);
    }

    #[test]
    fn test_validation() {
        let mut config = MergeConfig::default();
        config.name_prefix.clear();
        assert!(config.validate().is_err());

        let mut config = MergeConfig::default();
        config.name_substring.clear();
        assert!(config.validate().is_err());

        let mut config = MergeConfig::default();
        config.extension = "xlsx".into();
        assert!(config.validate().is_err());

        let mut config = MergeConfig::default();
        config.categories.push("Gain".into());
        assert!(config.validate().is_err());

        let mut config = MergeConfig::default();
        config.categories.push("  ".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheetmerge.toml");
        fs::write(&path, "sort_files = true\n[output]\nwrite_index = false\n").unwrap();
        let config = MergeConfig::from_file(&path).unwrap();
        assert!(config.sort_files);
        assert!(!config.output.write_index);

        fs::write(&path, "sort_files = 3\n").unwrap();
        assert!(matches!(
            MergeConfig::from_file(&path),
            Err(MergeError::Config(_))
        ));
    }
}
