use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use sheetmerge_core::housekeeping::{self, DEFAULT_MAX_AGE};
use sheetmerge_core::{MergeConfig, MissingPolicy, Pipeline, destination_path};
use std::path::PathBuf;
use std::time::Duration;

mod formatter;
mod logger;
mod prompt;

#[derive(Parser)]
#[command(name = "sheetmerge")]
#[command(about = "Merge same-named sheets from many measurement workbooks into one master workbook", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the master workbook
    Run(RunArgs),
    /// Delete recently modified workbooks in a directory
    Purge(PurgeArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Directory containing the source workbooks
    #[arg(short, long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Destination workbook (prompted for when omitted)
    #[arg(short, long, value_name = "FILE")]
    output: Option<String>,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Sheets to merge, overriding the configured categories
    #[arg(long, num_args = 1.., value_name = "SHEET")]
    categories: Vec<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,

    /// Keep rows that hold fewer values than the row threshold
    #[arg(long)]
    no_row_cleanup: bool,

    /// Merge files in name order instead of directory order
    #[arg(long)]
    sort: bool,

    /// Leave out categories missing from some workbook instead of aborting
    #[arg(long)]
    skip_missing: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,
}

#[derive(clap::Args)]
struct PurgeArgs {
    /// Directory to clean
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    dir: PathBuf,

    /// Maximum age in seconds of the files to delete
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_MAX_AGE.as_secs())]
    max_age: u64,

    /// File extension to match
    #[arg(long, default_value = ".xlsx")]
    extension: String,

    /// Show what would be deleted without deleting anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON output
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    match cli.command {
        Command::Run(args) => run(args),
        Command::Purge(args) => purge(args),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<MergeConfig> {
    if let Some(config_path) = path {
        return MergeConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()));
    }

    // Try to load default config from current directory if it exists
    let default_config_path = PathBuf::from("sheetmerge.toml");
    if default_config_path.exists() {
        MergeConfig::from_file(&default_config_path).with_context(|| {
            format!(
                "Failed to load config from {}",
                default_config_path.display()
            )
        })
    } else {
        Ok(MergeConfig::default())
    }
}

fn run(args: RunArgs) -> Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(dir) = args.dir {
        config.directory = dir;
    }
    if !args.categories.is_empty() {
        config.categories = args.categories;
    }
    if args.no_row_cleanup {
        config.clean.drop_sparse_rows = false;
    }
    if args.sort {
        config.sort_files = true;
    }
    if args.skip_missing {
        config.on_missing = MissingPolicy::Skip;
    }

    let pipeline = Pipeline::from_config(config).context("Invalid configuration")?;

    if !args.yes {
        formatter::print_intro(pipeline.config());
        if !prompt::confirm("If you understand the above, type Y to continue or anything else to exit: ")? {
            println!("Exiting...");
            return Ok(());
        }
    }

    let output = match args.output {
        Some(name) if !name.trim().is_empty() => name,
        Some(_) => anyhow::bail!("Destination file name must not be blank"),
        None => prompt::non_blank("Enter the .xlsx filename to export to: ")?,
    };
    let destination = destination_path(&output);

    if matches!(args.format, OutputFormat::Human) {
        println!("Merging sheets into {}...", destination.display());
    }
    let report = pipeline
        .run(&destination)
        .with_context(|| format!("Failed to build {}", destination.display()))?;

    match args.format {
        OutputFormat::Human => formatter::print_human(&report),
        OutputFormat::Json => formatter::print_json(&report)?,
    }
    Ok(())
}

fn purge(args: PurgeArgs) -> Result<()> {
    let affected = housekeeping::delete_recent(
        &args.dir,
        &args.extension,
        Duration::from_secs(args.max_age),
        args.dry_run,
    )
    .with_context(|| format!("Failed to clean {}", args.dir.display()))?;

    formatter::print_purge(&affected, args.dry_run);
    Ok(())
}
