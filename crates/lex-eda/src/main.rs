//! CLI entry point for the automated EDA tool.

use anyhow::{Result, anyhow, bail};
use clap::Parser;
use dotenv::dotenv;
use lex_eda::{
    ChartOutcome, DataLoader, EdaConfig, ImputationReport, LoadedSource, Session, UploadedFile,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Automated exploratory data analysis with plot storage",
    long_about = "Load a dataset, clean missing values, draw charts for one or two \
                  columns and keep every chart in a SQLite plot store.\n\n\
                  SUPPORTED INPUTS:\n  \
                  .csv, .xlsx, .xls, .db, .sqlite\n\n\
                  EXAMPLES:\n  \
                  # Preview and clean a CSV file\n  \
                  lex-eda -i sales.csv\n\n  \
                  # Line plot and histogram of one numeric column\n  \
                  lex-eda -i sales.csv -c price\n\n  \
                  # Box plot of a numeric column by category, then export the store\n  \
                  lex-eda -i sales.csv -c price -c region --export download.db\n\n  \
                  # List the tables of a database upload, then chart one\n  \
                  lex-eda -i shop.sqlite --list-tables\n  \
                  lex-eda -i shop.sqlite --table orders -c status"
)]
struct Args {
    /// File to analyze
    #[arg(short, long)]
    input: PathBuf,

    /// Table to load from a database upload
    #[arg(short, long)]
    table: Option<String>,

    /// List the tables of a database upload and exit
    #[arg(long)]
    list_tables: bool,

    /// Column to chart (give once or twice)
    #[arg(short, long = "column", num_args = 1)]
    columns: Vec<String>,

    /// Plot store file
    #[arg(short, long, default_value = "plots.db")]
    store: PathBuf,

    /// Copy the plot store to this path after charting
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Number of cleaned rows to preview
    #[arg(short, long, default_value = "5")]
    preview: usize,

    /// Seed for line-plot sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Chart width in pixels
    #[arg(long, default_value = "900")]
    width: u32,

    /// Chart height in pixels
    #[arg(long, default_value = "600")]
    height: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs; only the imputation report and chart outcomes are
    /// written.
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    // Load environment variables (RUST_LOG) from .env before the filter reads them
    dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    if !args.input.exists() {
        return Err(anyhow!("Input file not found: {}", args.input.display()));
    }
    if args.columns.len() > 2 {
        bail!("Select one or two columns, got {}", args.columns.len());
    }

    let upload = UploadedFile::from_path(&args.input)?;

    if args.list_tables {
        return list_tables(upload, args.json);
    }

    let mut builder = EdaConfig::builder()
        .store_path(&args.store)
        .image_size(args.width, args.height);
    if let Some(seed) = args.seed {
        builder = builder.sample_seed(seed);
    }
    let config = builder.build()?;

    let mut session_builder = Session::builder().config(config);
    if !args.quiet && !args.json {
        session_builder = session_builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }
    let mut session = session_builder.build()?;

    let report = session
        .load(upload, args.table.as_deref())
        .map_err(|e| anyhow!("{}", e))?;

    if !args.json {
        print_report(&session, &report, args.preview);
    }

    let columns: Vec<&str> = args.columns.iter().map(String::as_str).collect();
    let outcomes = if columns.is_empty() {
        Vec::new()
    } else {
        session.visualize(&columns)?
    };

    let export = match &args.export {
        Some(path) => Some(export_store(&session, path)?),
        None => None,
    };

    if args.json {
        let output = json!({
            "input": args.input.display().to_string(),
            "imputation": report,
            "charts": outcomes,
            "store": session.store().path().display().to_string(),
            "export": export,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_outcomes(&outcomes, &session);
    }

    if !outcomes.is_empty() && outcomes.iter().all(|o| !o.is_ok()) {
        error!("No chart could be rendered");
    }
    Ok(())
}

/// Print the tables of a database upload.
fn list_tables(upload: UploadedFile, json_output: bool) -> Result<()> {
    match DataLoader::open(upload)? {
        LoadedSource::Database(source) => {
            if json_output {
                println!("{}", serde_json::to_string_pretty(source.tables())?);
            } else {
                for table in source.tables() {
                    println!("{}", table);
                }
            }
            Ok(())
        }
        LoadedSource::Ready(_) => bail!("--list-tables only applies to .db and .sqlite uploads"),
    }
}

fn export_store(session: &Session, path: &Path) -> Result<serde_json::Value> {
    let artifact = session.store().export_to(path)?;
    info!(
        "Exported {} ({}, {} bytes) to {}",
        artifact.file_name,
        artifact.content_type,
        artifact.bytes.len(),
        path.display()
    );
    Ok(json!({
        "path": path.display().to_string(),
        "file_name": artifact.file_name,
        "content_type": artifact.content_type,
        "bytes": artifact.bytes.len(),
    }))
}

/// Human-readable summary of the cleaning pass.
///
/// Uses `println!` intentionally: this is the primary output of the CLI and
/// must be visible regardless of log level.
fn print_report(session: &Session, report: &ImputationReport, preview: usize) {
    println!("\n{}", "=".repeat(80));
    println!("MISSING VALUE HANDLING");
    println!("{}", "=".repeat(80));
    println!(
        "  Rows: {}  Columns: {} -> {}",
        report.rows, report.columns_before, report.columns_after
    );
    println!();
    println!(
        "{:<24} {:<12} {:>10}  {}",
        "Column", "Kind", "Missing %", "Action"
    );
    println!("{}", "-".repeat(70));
    for column in &report.columns {
        println!(
            "{:<24} {:<12} {:>10.1}  {}",
            lex_eda::utils::shorten_label(&column.column, 20),
            column.kind,
            column.stats.missing_fraction * 100.0,
            column.action
        );
    }

    if let Some(table) = session.table() {
        println!("\nPREVIEW (first {} rows)", preview);
        println!("{}", table.head(preview));
    }
}

fn print_outcomes(outcomes: &[ChartOutcome], session: &Session) {
    if outcomes.is_empty() {
        return;
    }

    println!("\n{}", "=".repeat(80));
    println!("CHARTS");
    println!("{}", "=".repeat(80));
    for outcome in outcomes {
        match &outcome.result {
            Ok(chart) => println!("  [stored] {} ({} bytes)", chart.title, chart.png.len()),
            Err(e) => println!("  [failed] {}: {}", outcome.spec.title, e),
        }
    }

    match session.store().len() {
        Ok(count) => println!(
            "\nPlot store {} now holds {} charts",
            session.store().path().display(),
            count
        ),
        Err(e) => error!("Could not count stored charts: {}", e),
    }
}
