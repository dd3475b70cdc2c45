//! In-memory table model for parsed sheets

use std::collections::{HashMap, HashSet};
use std::fmt;

/// Non-null cell value types
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl CellValue {
    /// Get the number if this is a numeric cell
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the text if this is a text cell
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Bool(true) => f.write_str("True"),
            CellValue::Bool(false) => f.write_str("False"),
        }
    }
}

/// A single data row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Position of the row among the data rows of its source sheet
    pub label: usize,
    pub cells: Vec<Option<CellValue>>,
}

impl Row {
    /// Number of cells holding a value
    pub fn non_null_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

/// A sheet's contents: named columns over rows of nullable cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Create an empty table with the given column names
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from a raw grid whose first row is the header.
    ///
    /// Blank header cells become `Unnamed: <position>` and repeated names get
    /// `.1`, `.2`, ... suffixes so every column label is unique.
    pub fn from_grid(grid: Vec<Vec<Option<CellValue>>>) -> Self {
        let mut grid = grid.into_iter();
        let Some(header) = grid.next() else {
            return Self::default();
        };

        let width = header.len();
        let mut seen = HashSet::new();
        let columns = header
            .iter()
            .enumerate()
            .map(|(idx, cell)| {
                let base = match cell {
                    Some(value) => value.to_string(),
                    None => format!("Unnamed: {}", idx),
                };
                let mut name = base.clone();
                let mut suffix = 0;
                while seen.contains(&name) {
                    suffix += 1;
                    name = format!("{}.{}", base, suffix);
                }
                seen.insert(name.clone());
                name
            })
            .collect();

        let mut table = Self::new(columns);
        for (label, mut cells) in grid.enumerate() {
            cells.resize(width, None);
            table.rows.push(Row { label, cells });
        }
        table
    }

    /// Append a row, padding or truncating it to the column count
    pub fn push_row(&mut self, label: usize, mut cells: Vec<Option<CellValue>>) {
        cells.resize(self.columns.len(), None);
        self.rows.push(Row { label, cells });
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.columns.is_empty()
    }

    /// Position of a column by label
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Get a cell by row position and column label
    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.cells.get(col)?.as_ref()
    }

    /// Non-null cell count for each column, in column order
    pub fn column_non_null_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.columns.len()];
        for row in &self.rows {
            for (count, cell) in counts.iter_mut().zip(&row.cells) {
                if cell.is_some() {
                    *count += 1;
                }
            }
        }
        counts
    }

    /// Keep only rows for which `keep` returns true
    pub fn retain_rows<F: FnMut(&Row) -> bool>(self, keep: F) -> Self {
        let Self { columns, rows } = self;
        Self {
            columns,
            rows: rows.into_iter().filter(keep).collect(),
        }
    }

    /// Keep only the columns whose positions are flagged in `keep`
    pub fn retain_columns(self, keep: &[bool]) -> Self {
        let Self { columns, rows } = self;
        let columns = columns
            .into_iter()
            .zip(keep)
            .filter_map(|(name, &k)| k.then_some(name))
            .collect();
        let rows = rows
            .into_iter()
            .map(|row| Row {
                label: row.label,
                cells: row
                    .cells
                    .into_iter()
                    .zip(keep)
                    .filter_map(|(cell, &k)| k.then_some(cell))
                    .collect(),
            })
            .collect();
        Self { columns, rows }
    }

    /// Concatenate tables vertically, aligning cells by column label.
    ///
    /// The merged column list is the union of all column lists in order of
    /// first appearance. Cells for columns a table does not have are null.
    pub fn concat(tables: Vec<Table>) -> Table {
        let mut columns: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for table in &tables {
            for name in &table.columns {
                if !positions.contains_key(name) {
                    positions.insert(name.clone(), columns.len());
                    columns.push(name.clone());
                }
            }
        }

        let width = columns.len();
        let mut rows = Vec::with_capacity(tables.iter().map(Table::row_count).sum());
        for table in tables {
            let mapping: Vec<usize> = table.columns.iter().map(|name| positions[name]).collect();
            for row in table.rows {
                let mut cells = vec![None; width];
                for (cell, &target) in row.cells.into_iter().zip(&mapping) {
                    cells[target] = cell;
                }
                rows.push(Row {
                    label: row.label,
                    cells,
                });
            }
        }

        Table { columns, rows }
    }
}
