//! Source workbook access through calamine

use crate::config::OutputOptions;
use crate::error::{MergeError, Result};
use crate::table::{CellValue, Table};
use crate::writer;
use calamine::{Data, Range, Reader, Sheets, open_workbook_auto};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a sheet lookup did not find the sheet
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    /// The workbook opened but has no sheet with that name
    #[error("sheet not found")]
    NotFound,
    /// The file could not be opened as a workbook
    #[error("failed to open workbook: {0}")]
    OpenFailed(String),
}

impl LookupError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound)
    }
}

/// An opened source workbook
pub trait SourceWorkbook {
    /// Sheet names in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// Parse a sheet into a table, first row as header
    fn read_sheet(&mut self, name: &str) -> Result<Table>;
}

/// Trait for spreadsheet storage backends
pub trait SpreadsheetStore {
    type Workbook: SourceWorkbook;

    /// Open a workbook for reading
    fn open(&self, path: &Path) -> Result<Self::Workbook>;

    /// Write a table as a sheet, creating the workbook when it does not exist
    fn write_sheet(&self, path: &Path, sheet: &str, table: &Table) -> Result<()>;

    /// Check whether `path` has a sheet named exactly `sheet`
    fn sheet_exists(&self, path: &Path, sheet: &str) -> std::result::Result<(), LookupError> {
        let workbook = self
            .open(path)
            .map_err(|e| LookupError::OpenFailed(e.to_string()))?;
        if workbook.sheet_names().iter().any(|name| name == sheet) {
            Ok(())
        } else {
            Err(LookupError::NotFound)
        }
    }
}

/// Store reading any format calamine supports and writing `.xlsx`
#[derive(Debug, Clone)]
pub struct CalamineStore {
    na_values: HashSet<String>,
    output: OutputOptions,
}

impl CalamineStore {
    pub fn new<I, S>(na_values: I, output: OutputOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            na_values: na_values.into_iter().map(Into::into).collect(),
            output,
        }
    }
}

impl Default for CalamineStore {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_NA_VALUES, OutputOptions::default())
    }
}

impl SpreadsheetStore for CalamineStore {
    type Workbook = CalamineWorkbook;

    fn open(&self, path: &Path) -> Result<CalamineWorkbook> {
        let sheets = open_workbook_auto(path).map_err(|e| MergeError::ContainerOpen {
            file: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(CalamineWorkbook {
            path: path.to_path_buf(),
            sheets,
            na_values: self.na_values.clone(),
        })
    }

    fn write_sheet(&self, path: &Path, sheet: &str, table: &Table) -> Result<()> {
        writer::write_sheet(path, sheet, table, &self.output)
    }
}

/// Workbook opened with calamine
pub struct CalamineWorkbook {
    path: PathBuf,
    sheets: Sheets<BufReader<File>>,
    na_values: HashSet<String>,
}

impl SourceWorkbook for CalamineWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Table> {
        let range = self
            .sheets
            .worksheet_range(name)
            .map_err(|e| MergeError::SheetRead {
                file: self.path.clone(),
                sheet: name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Table::from_grid(range_to_grid(&range, &self.na_values)))
    }
}

/// Convert a calamine range into rows of nullable cells.
///
/// Leading empty columns are kept so header positions match the sheet's
/// column positions; leading empty rows are not part of the range.
fn range_to_grid(range: &Range<Data>, na_values: &HashSet<String>) -> Vec<Vec<Option<CellValue>>> {
    let lead = range.start().map(|(_, col)| col as usize).unwrap_or(0);
    range
        .rows()
        .map(|row| {
            let mut cells = vec![None; lead];
            cells.extend(row.iter().map(|data| parse_cell_value(data, na_values)));
            cells
        })
        .collect()
}

fn parse_cell_value(data: &Data, na_values: &HashSet<String>) -> Option<CellValue> {
    match data {
        Data::Int(i) => Some(CellValue::Number(*i as f64)),
        Data::Float(f) => Some(CellValue::Number(*f)),
        Data::String(s) if na_values.contains(s) => None,
        Data::String(s) => Some(CellValue::Text(s.clone())),
        Data::Bool(b) => Some(CellValue::Bool(*b)),
        Data::DateTime(dt) => Some(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) => Some(CellValue::Text(s.clone())),
        Data::DurationIso(s) => Some(CellValue::Text(s.clone())),
        Data::Error(_) | Data::Empty => None,
    }
}
