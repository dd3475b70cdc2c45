//! Cross-workbook concatenation of same-named sheets

use crate::error::{MergeError, Result};
use crate::reader::{SourceWorkbook, SpreadsheetStore};
use crate::table::Table;
use std::path::PathBuf;

/// Concatenate the sheet named `category` from every file, in file order.
///
/// Fails on the first file that has no sheet with exactly that name; no
/// partial table is returned. An empty file list yields an empty table.
pub fn merge<S: SpreadsheetStore>(store: &S, files: &[PathBuf], category: &str) -> Result<Table> {
    let mut tables = Vec::with_capacity(files.len());

    for file in files {
        let mut workbook = store.open(file)?;
        if !workbook.sheet_names().iter().any(|name| name == category) {
            return Err(MergeError::MissingCategory {
                file: file.clone(),
                category: category.to_string(),
            });
        }

        let table = workbook.read_sheet(category)?;
        log::debug!(
            "Read {} row(s) of '{}' from {}",
            table.row_count(),
            category,
            file.display()
        );
        tables.push(table);
    }

    Ok(Table::concat(tables))
}
