//! Sparse row/column removal for merged tables
//!
//! Source sheets carry a category label in a column of its own, so after
//! merging several files those label columns hold one value per file. Some
//! rows hold nothing but a lone placeholder (usually `0`). Both are pruned by
//! non-null count thresholds.

use crate::config::CleanOptions;
use crate::table::Table;

/// Remove rows with fewer than `min_non_null` non-null cells
pub fn drop_sparse_rows(table: Table, min_non_null: usize) -> Table {
    table.retain_rows(|row| row.non_null_count() >= min_non_null)
}

/// Remove columns with fewer than `min_non_null` non-null cells across all rows
pub fn drop_sparse_columns(table: Table, min_non_null: usize) -> Table {
    let keep: Vec<bool> = table
        .column_non_null_counts()
        .into_iter()
        .map(|count| count >= min_non_null)
        .collect();
    table.retain_columns(&keep)
}

/// Apply row cleaning (when enabled) and then column cleaning
pub fn clean(table: Table, options: &CleanOptions) -> Table {
    let table = if options.drop_sparse_rows {
        drop_sparse_rows(table, options.min_row_values)
    } else {
        table
    };
    drop_sparse_columns(table, options.min_column_values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merger::tests::table;

    #[test]
    fn test_drop_sparse_rows() {
        let input = table(
            &["a", "b", "c"],
            &[
                vec![None, None, Some(5.0)],
                vec![None, Some(3.0), Some(5.0)],
                vec![None, None, None],
                vec![Some(1.0), Some(2.0), Some(3.0)],
            ],
        );
        let out = drop_sparse_rows(input, 2);
        assert_eq!(out.row_count(), 2);
        let labels: Vec<usize> = out.rows().iter().map(|r| r.label).collect();
        assert_eq!(labels, vec![1, 3]);
        assert_eq!(out.column_count(), 3);
    }

    #[test]
    fn test_drop_sparse_rows_zero_threshold_keeps_everything() {
        let input = table(&["a"], &[vec![None], vec![Some(1.0)]]);
        assert_eq!(drop_sparse_rows(input, 0).row_count(), 2);
    }

    #[test]
    fn test_drop_sparse_columns() {
        let mut rows = vec![vec![None, None, Some(1.0)]; 10];
        rows[0] = vec![Some(9.0), Some(1.0), Some(1.0)];
        rows[5] = vec![None, Some(2.0), Some(1.0)];
        let input = table(&["label", "pair", "full"], &rows);

        let out = drop_sparse_columns(input, 2);
        assert_eq!(out.columns(), &["pair", "full"]);
        assert_eq!(out.row_count(), 10);
        assert_eq!(out.rows()[0].cells.len(), 2);
    }

    #[test]
    fn test_drop_sparse_columns_idempotent() {
        let input = table(
            &["a", "b", "c"],
            &[
                vec![Some(1.0), None, Some(1.0)],
                vec![Some(1.0), Some(2.0), None],
                vec![None, None, Some(1.0)],
            ],
        );
        let once = drop_sparse_columns(input, 2);
        let twice = drop_sparse_columns(once.clone(), 2);
        assert_eq!(once, twice);
        assert_eq!(once.columns(), &["a", "c"]);
    }

    #[test]
    fn test_clean_order() {
        // Row cleaning first lowers the count of column "b" below the threshold
        let input = table(
            &["a", "b", "c"],
            &[
                vec![Some(1.0), Some(1.0), Some(1.0)],
                vec![None, Some(0.0), None],
                vec![Some(2.0), None, Some(2.0)],
            ],
        );
        let options = CleanOptions::default();
        let out = clean(input.clone(), &options);
        assert_eq!(out.columns(), &["a", "c"]);
        assert_eq!(out.row_count(), 2);

        let options = CleanOptions {
            drop_sparse_rows: false,
            ..CleanOptions::default()
        };
        let out = clean(input, &options);
        assert_eq!(out.columns(), &["a", "b", "c"]);
        assert_eq!(out.row_count(), 3);
    }
}
