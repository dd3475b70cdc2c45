//! Error types for the merge pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while locating, merging or writing workbooks
#[derive(Debug, Error)]
pub enum MergeError {
    /// The scan directory could not be listed
    #[error("Failed to read directory {}: {source}", dir.display())]
    Discovery {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A located workbook has no sheet named after the category being merged
    #[error(
        "The sheet name {category} was not found in {}. Rename the sheet to be consistent with the other workbooks.",
        file.display()
    )]
    MissingCategory { file: PathBuf, category: String },

    /// The file is not a readable spreadsheet container
    #[error("Failed to open workbook {}: {reason}", file.display())]
    ContainerOpen { file: PathBuf, reason: String },

    #[error("Failed to read sheet '{sheet}' from {}: {reason}", file.display())]
    SheetRead {
        file: PathBuf,
        sheet: String,
        reason: String,
    },

    /// The destination workbook could not be created or appended to
    #[error("Failed to write workbook {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Sheet '{sheet}' already exists in {}", path.display())]
    SheetExists { path: PathBuf, sheet: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MergeError {
    /// Check if the error is a missing category sheet
    pub fn is_missing_category(&self) -> bool {
        matches!(self, MergeError::MissingCategory { .. })
    }
}

pub type Result<T> = std::result::Result<T, MergeError>;
