//! sheetmerge-core: merge same-named sheets from many workbooks into one
//!
//! Source workbooks are found by a file naming convention, each configured
//! category sheet is concatenated across all of them, near-empty rows and
//! columns are pruned, and the result is written to a master workbook with
//! one sheet per category.

pub mod cleaner;
pub mod config;
pub mod error;
pub mod housekeeping;
pub mod locator;
pub mod merger;
pub mod pipeline;
pub mod reader;
pub mod table;
pub mod writer;

pub use config::{CleanOptions, MergeConfig, MissingPolicy, OutputOptions, SheetConflict};
pub use error::{MergeError, Result};
pub use pipeline::{CategoryReport, CategoryStatus, Pipeline, RunReport, destination_path};
pub use reader::{CalamineStore, LookupError, SourceWorkbook, SpreadsheetStore};
pub use table::{CellValue, Row, Table};
