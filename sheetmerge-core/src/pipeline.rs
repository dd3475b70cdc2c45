//! Locate, merge, clean and write, one category at a time

use crate::cleaner;
use crate::config::{MergeConfig, MissingPolicy};
use crate::error::{MergeError, Result};
use crate::locator::{self, NamePattern};
use crate::merger;
use crate::reader::{CalamineStore, SpreadsheetStore};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Outcome of one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CategoryStatus {
    Written,
    /// A source workbook lacked the sheet and the skip policy was active
    Skipped { file: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryReport {
    pub category: String,
    /// Number of source workbooks merged
    pub files: usize,
    pub merged_rows: usize,
    pub merged_columns: usize,
    pub rows: usize,
    pub columns: usize,
    #[serde(flatten)]
    pub status: CategoryStatus,
}

impl CategoryReport {
    fn skipped(category: &str, files: usize, file: PathBuf) -> Self {
        Self {
            category: category.to_string(),
            files,
            merged_rows: 0,
            merged_columns: 0,
            rows: 0,
            columns: 0,
            status: CategoryStatus::Skipped { file },
        }
    }
}

/// Summary of a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub destination: PathBuf,
    pub categories: Vec<CategoryReport>,
}

impl RunReport {
    pub fn written(&self) -> impl Iterator<Item = &CategoryReport> {
        self.categories
            .iter()
            .filter(|c| c.status == CategoryStatus::Written)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &CategoryReport> {
        self.categories
            .iter()
            .filter(|c| matches!(c.status, CategoryStatus::Skipped { .. }))
    }
}

/// Turn a user supplied destination name into a workbook path
pub fn destination_path(name: &str) -> PathBuf {
    let name = name.trim();
    if name.to_ascii_lowercase().ends_with(".xlsx") {
        PathBuf::from(name)
    } else {
        PathBuf::from(format!("{}.xlsx", name))
    }
}

/// The merge pipeline over a spreadsheet store
pub struct Pipeline<S: SpreadsheetStore> {
    store: S,
    config: MergeConfig,
}

impl Pipeline<CalamineStore> {
    /// Create a pipeline reading and writing real workbooks
    pub fn from_config(config: MergeConfig) -> Result<Self> {
        let store = CalamineStore::new(config.na_values.iter().cloned(), config.output);
        Self::new(store, config)
    }
}

impl<S: SpreadsheetStore> Pipeline<S> {
    pub fn new(store: S, config: MergeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Locate source workbooks, leaving out `destination`
    pub fn locate_files(&self, destination: &Path) -> Result<Vec<PathBuf>> {
        let pattern = NamePattern::new(
            &self.config.name_prefix,
            &self.config.name_substring,
            &self.config.extension,
        );
        let mut files = locator::locate(&self.config.directory, &pattern)?;
        files.retain(|file| {
            let is_destination = same_file(file, destination);
            if is_destination {
                log::warn!(
                    "Not merging {} because it is the destination workbook",
                    file.display()
                );
            }
            !is_destination
        });
        if self.config.sort_files {
            locator::sort_by_name(&mut files);
        }
        Ok(files)
    }

    /// Run every configured category into `destination`
    pub fn run(&self, destination: &Path) -> Result<RunReport> {
        self.run_categories(&self.config.categories, destination)
    }

    /// Run the given categories, in order, into `destination`.
    ///
    /// Each category is written as soon as it is cleaned. A failure stops the
    /// run and leaves already written sheets in place.
    pub fn run_categories(&self, categories: &[String], destination: &Path) -> Result<RunReport> {
        let mut report = RunReport {
            destination: destination.to_path_buf(),
            categories: Vec::with_capacity(categories.len()),
        };

        for category in categories {
            let category_report = self.run_category(category, destination)?;
            report.categories.push(category_report);
        }

        Ok(report)
    }

    /// Locate, merge, clean and write a single category
    pub fn run_category(&self, category: &str, destination: &Path) -> Result<CategoryReport> {
        let files = self.locate_files(destination)?;
        log::info!("Merging '{}' across {} workbook(s)", category, files.len());

        let merged = match merger::merge(&self.store, &files, category) {
            Ok(table) => table,
            Err(MergeError::MissingCategory { file, .. })
                if self.config.on_missing == MissingPolicy::Skip =>
            {
                log::warn!(
                    "Skipping '{}': sheet not found in {}",
                    category,
                    file.display()
                );
                return Ok(CategoryReport::skipped(category, files.len(), file));
            }
            Err(e) => return Err(e),
        };

        let merged_rows = merged.row_count();
        let merged_columns = merged.column_count();
        let cleaned = cleaner::clean(merged, &self.config.clean);
        log::debug!(
            "'{}': {}x{} merged, {}x{} after cleaning",
            category,
            merged_rows,
            merged_columns,
            cleaned.row_count(),
            cleaned.column_count()
        );

        self.store.write_sheet(destination, category, &cleaned)?;
        log::info!("Wrote sheet '{}' to {}", category, destination.display());

        Ok(CategoryReport {
            category: category.to_string(),
            files: files.len(),
            merged_rows,
            merged_columns,
            rows: cleaned.row_count(),
            columns: cleaned.column_count(),
            status: CategoryStatus::Written,
        })
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merger::tests::{MemoryStore, table};
    use std::fs;

    fn config_for(dir: &Path, categories: &[&str]) -> MergeConfig {
        MergeConfig {
            directory: dir.to_path_buf(),
            categories: categories.iter().map(|s| s.to_string()).collect(),
            sort_files: true,
            ..MergeConfig::default()
        }
    }

    /// Memory store whose file keys are real (empty) files in `dir`
    fn store_with(dir: &Path, files: Vec<(&str, Vec<(&str, crate::table::Table)>)>) -> MemoryStore {
        let mut store = MemoryStore::default();
        for (name, sheets) in files {
            let path = dir.join(name);
            fs::write(&path, b"").unwrap();
            store.add(path.to_str().unwrap(), sheets);
        }
        store
    }

    #[test]
    fn test_destination_path() {
        assert_eq!(destination_path(" master "), PathBuf::from("master.xlsx"));
        assert_eq!(destination_path("master.xlsx"), PathBuf::from("master.xlsx"));
        assert_eq!(destination_path("Master.XLSX"), PathBuf::from("Master.XLSX"));
    }

    #[test]
    fn test_run_writes_each_category_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let gain = table(&["a", "b"], &[vec![Some(1.0), Some(2.0)], vec![Some(3.0), Some(4.0)]]);
        let mc = table(&["a", "b"], &[vec![Some(5.0), Some(6.0)], vec![Some(7.0), Some(8.0)]]);
        let store = store_with(
            dir.path(),
            vec![
                ("Scribe1_ADC_Analysis.xlsx", vec![("MC", mc.clone()), ("Gain", gain.clone())]),
                ("Scribe2_ADC_Analysis.xlsx", vec![("Gain", gain), ("MC", mc)]),
                ("Other.xlsx", vec![]),
            ],
        );

        let pipeline = Pipeline::new(store, config_for(dir.path(), &["Gain", "MC"])).unwrap();
        let destination = dir.path().join("master.xlsx");
        let report = pipeline.run(&destination).unwrap();

        let written = pipeline.store().written.borrow();
        let sheets: Vec<&str> = written.iter().map(|(_, s, _)| s.as_str()).collect();
        assert_eq!(sheets, vec!["Gain", "MC"]);
        assert_eq!(written[0].2.row_count(), 4);
        assert_eq!(written[0].0, destination);
        assert_eq!(report.categories.len(), 2);
        assert_eq!(report.categories[0].files, 2);
        assert_eq!(report.categories[1].rows, 4);
        assert_eq!(report.written().count(), 2);
    }

    #[test]
    fn test_run_aborts_on_missing_category() {
        let dir = tempfile::tempdir().unwrap();
        let t = table(&["a", "b"], &[vec![Some(1.0), Some(2.0)]]);
        let store = store_with(
            dir.path(),
            vec![
                ("Scribe1_Analysis.xlsx", vec![("MC", t.clone()), ("Gain", t.clone())]),
                ("Scribe2_Analysis.xlsx", vec![("MC", t)]),
            ],
        );

        let pipeline = Pipeline::new(store, config_for(dir.path(), &["MC", "Gain", "INL"])).unwrap();
        let err = pipeline.run(&dir.path().join("out.xlsx")).unwrap_err();
        match err {
            MergeError::MissingCategory { file, category } => {
                assert!(file.ends_with("Scribe2_Analysis.xlsx"));
                assert_eq!(category, "Gain");
            }
            other => panic!("unexpected error: {other}"),
        }

        // MC was already written and stays written
        let written = pipeline.store().written.borrow();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].1, "MC");
    }

    #[test]
    fn test_run_skips_missing_category_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let t = table(&["a", "b"], &[vec![Some(1.0), Some(2.0)]]);
        let store = store_with(
            dir.path(),
            vec![
                ("Scribe1_Analysis.xlsx", vec![("MC", t.clone()), ("Gain", t.clone())]),
                ("Scribe2_Analysis.xlsx", vec![("MC", t.clone()), ("INL", t)]),
            ],
        );

        let mut config = config_for(dir.path(), &["Gain", "MC"]);
        config.on_missing = MissingPolicy::Skip;
        let pipeline = Pipeline::new(store, config).unwrap();
        let report = pipeline.run(&dir.path().join("out.xlsx")).unwrap();

        assert_eq!(report.skipped().count(), 1);
        assert_eq!(report.categories[0].category, "Gain");
        assert!(matches!(
            &report.categories[0].status,
            CategoryStatus::Skipped { file } if file.ends_with("Scribe2_Analysis.xlsx")
        ));
        let written = pipeline.store().written.borrow();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].1, "MC");
    }

    #[test]
    fn test_run_empty_directory_writes_empty_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            MemoryStore::default(),
            MergeConfig {
                directory: dir.path().to_path_buf(),
                ..MergeConfig::default()
            },
        )
        .unwrap();

        let report = pipeline.run(&dir.path().join("out.xlsx")).unwrap();
        assert_eq!(report.categories.len(), 6);
        let written = pipeline.store().written.borrow();
        assert_eq!(written.len(), 6);
        assert!(written.iter().all(|(_, _, t)| t.row_count() == 0));
        assert_eq!(written[5].1, "INL");
    }

    #[test]
    fn test_destination_is_not_merged() {
        let dir = tempfile::tempdir().unwrap();
        let t = table(&["a", "b"], &[vec![Some(1.0), Some(2.0)]]);
        let store = store_with(
            dir.path(),
            vec![
                ("Scribe1_Analysis.xlsx", vec![("MC", t.clone())]),
                ("Scribe_Master_Analysis.xlsx", vec![]),
            ],
        );

        let pipeline = Pipeline::new(store, config_for(dir.path(), &["MC"])).unwrap();
        let destination = dir.path().join("Scribe_Master_Analysis.xlsx");
        let files = pipeline.locate_files(&destination).unwrap();
        assert_eq!(files.len(), 1);
        assert!(pipeline.run(&destination).is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = MergeConfig {
            name_prefix: String::new(),
            ..MergeConfig::default()
        };
        assert!(matches!(
            Pipeline::new(MemoryStore::default(), config),
            Err(MergeError::Config(_))
        ));
    }
}
