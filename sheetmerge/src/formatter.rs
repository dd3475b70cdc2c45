//! Output formatters for run reports

use anyhow::Result;
use colored::*;
use sheetmerge_core::{CategoryStatus, MergeConfig, RunReport};
use std::path::PathBuf;

/// Explain what a run will do before asking for confirmation
pub fn print_intro(config: &MergeConfig) {
    println!(
        "{}",
        format!(
            "This combines workbooks named {}(...){}(...){} into a new workbook with the name you choose.",
            config.name_prefix, config.name_substring, config.extension
        )
        .bold()
    );
    println!();
    println!(
        "Every workbook in {} must contain these sheets, with this exact casing (order does not matter): {}",
        config.directory.display().to_string().cyan(),
        config.categories.join(", ").cyan()
    );
    println!("Any other sheets are ignored.");
    if config.sort_files {
        println!("Workbooks are merged in file name order.");
    } else {
        println!("Workbooks are merged in directory listing order.");
    }
    println!();
}

/// Print the run summary in human-readable format
pub fn print_human(report: &RunReport) {
    println!();
    println!(
        "{} {}",
        "Destination:".bold(),
        report.destination.display().to_string().cyan()
    );

    for category in &report.categories {
        match &category.status {
            CategoryStatus::Written => println!(
                "  {} {} {} rows x {} columns from {} workbook(s) ({} x {} before cleaning)",
                "✓".green().bold(),
                category.category.bold(),
                category.rows,
                category.columns,
                category.files,
                category.merged_rows,
                category.merged_columns
            ),
            CategoryStatus::Skipped { file } => println!(
                "  {} {} skipped, sheet missing from {}",
                "!".yellow().bold(),
                category.category.bold(),
                file.display().to_string().yellow()
            ),
        }
    }

    println!();
    let skipped = report.skipped().count();
    if skipped == 0 {
        println!("{}", "DONE".green().bold());
    } else {
        println!(
            "{} {} sheet(s) written, {} skipped",
            "DONE".yellow().bold(),
            report.written().count(),
            skipped
        );
    }
}

/// Print the run summary in JSON format
pub fn print_json(report: &RunReport) -> Result<()> {
    let output = serde_json::json!({
        "destination": report.destination.display().to_string(),
        "categories": report.categories,
        "summary": {
            "written": report.written().count(),
            "skipped": report.skipped().count(),
        }
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Print the files removed (or that would be removed) by a purge
pub fn print_purge(affected: &[PathBuf], dry_run: bool) {
    if affected.is_empty() {
        println!("{}", "No recent files found.".green());
        return;
    }

    let action = if dry_run { "Would delete:" } else { "Deleted:" };
    println!("{}", action.bold().underline());
    for path in affected {
        println!("  - {}", path.display());
    }
}
