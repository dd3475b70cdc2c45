// ! Writer module for creating and extending Excel workbooks

mod xlsx_writer;

pub use xlsx_writer::{AppendOutcome, append_sheet, column_name, create_workbook, render_worksheet};

use crate::config::{OutputOptions, SheetConflict};
use crate::error::{MergeError, Result};
use crate::table::Table;
use std::path::Path;

/// Characters Excel rejects in sheet names
const INVALID_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Write `table` into `path` as a sheet named `sheet`.
///
/// A missing workbook is created with that single sheet; an existing one gets
/// the sheet appended, or replaced when `options` allow it.
pub fn write_sheet(path: &Path, sheet: &str, table: &Table, options: &OutputOptions) -> Result<()> {
    validate_sheet_name(sheet).map_err(|reason| MergeError::Write {
        path: path.to_path_buf(),
        source: reason.into(),
    })?;

    let worksheet = render_worksheet(table, options.write_index).map_err(|e| MergeError::Write {
        path: path.to_path_buf(),
        source: e.into(),
    })?;

    if !path.exists() {
        return create_workbook(path, sheet, &worksheet).map_err(|e| MergeError::Write {
            path: path.to_path_buf(),
            source: e.into(),
        });
    }

    let replace = options.if_sheet_exists == SheetConflict::Replace;
    match append_sheet(path, sheet, &worksheet, replace) {
        Ok(AppendOutcome::Conflict) => Err(MergeError::SheetExists {
            path: path.to_path_buf(),
            sheet: sheet.to_string(),
        }),
        Ok(_) => Ok(()),
        Err(e) => Err(MergeError::Write {
            path: path.to_path_buf(),
            source: e.into(),
        }),
    }
}

fn validate_sheet_name(sheet: &str) -> std::result::Result<(), String> {
    if sheet.is_empty() {
        return Err("sheet name is empty".to_string());
    }
    if sheet.chars().count() > 31 {
        return Err(format!("sheet name '{}' is longer than 31 characters", sheet));
    }
    if let Some(c) = sheet.chars().find(|c| INVALID_SHEET_CHARS.contains(c)) {
        return Err(format!("sheet name '{}' contains '{}'", sheet, c));
    }
    if sheet.starts_with('\'') || sheet.ends_with('\'') {
        return Err(format!("sheet name '{}' starts or ends with a quote", sheet));
    }
    Ok(())
}
