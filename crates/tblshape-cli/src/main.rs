//! tblshape CLI
//!
//! Command-line tool for normalizing raw sheet exports into a canonical table.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tblshape_core::{
    best_candidate, load_workbook, run, save_workbook, score_sheets, AuditLog, GridStore,
    PipelineConfig, Rect, SheetId, Workbook, DEFAULT_LOG_SHEET,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tblshape")]
#[command(about = "Normalize raw sheet exports into a canonical table", long_about = None)]
#[command(version)]
struct Cli {
    /// Print debug diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline on a workbook and save the result
    Run {
        /// Workbook to read (.json, .csv or a CSV directory)
        #[arg(short, long)]
        input: PathBuf,

        /// Where to save the result (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pipeline configuration (JSON); defaults to the SAP profile
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how each sheet scores as a data candidate
    Inspect {
        /// Workbook to read
        #[arg(short, long)]
        input: PathBuf,

        /// Audit sheet to skip
        #[arg(long, default_value = DEFAULT_LOG_SHEET)]
        log_sheet: String,
    },

    /// Print the audit log of a workbook
    Log {
        /// Workbook to read
        #[arg(short, long)]
        input: PathBuf,

        /// Audit sheet name
        #[arg(long, default_value = DEFAULT_LOG_SHEET)]
        log_sheet: String,
    },

    /// Print the contents of a sheet
    Show {
        /// Workbook to read
        #[arg(short, long)]
        input: PathBuf,

        /// Sheet name (defaults to the first sheet)
        #[arg(short, long)]
        sheet: Option<String>,

        /// Maximum number of rows to display
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Write the default configuration to a file
    CreateConfig {
        /// Output path for the config file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = dispatch(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// RUST_LOG wins; otherwise warnings only, or debug with `--verbose`
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn dispatch(command: Commands) -> tblshape_core::Result<()> {
    match command {
        Commands::Run {
            input,
            output,
            config,
            json,
        } => cmd_run(&input, output.as_deref(), config.as_deref(), json),
        Commands::Inspect { input, log_sheet } => cmd_inspect(&input, &log_sheet),
        Commands::Log { input, log_sheet } => cmd_log(&input, &log_sheet),
        Commands::Show { input, sheet, limit } => cmd_show(&input, sheet.as_deref(), limit),
        Commands::CreateConfig { output } => cmd_create_config(&output),
    }
}

fn cmd_run(input: &Path, output: Option<&Path>, config: Option<&Path>, json: bool) -> tblshape_core::Result<()> {
    let config = match config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let mut workbook = load_workbook(input)?;
    let target = output.map(Path::to_path_buf).unwrap_or_else(|| default_output(input));
    tracing::debug!(input = %input.display(), output = %target.display(), "running pipeline");

    let result = run(&mut workbook, &config);

    // the audit trail is worth keeping even when the run failed
    let written = save_workbook(&workbook, &target)?;
    let report = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Source sheet: {}", report.source_sheet);
        println!("Result: '{}' on sheet '{}' at {}", report.region_name, report.sheet_name, report.bounds.address());
        println!("Columns: {}", report.headers.join(" | "));
        println!("Rows: {}", report.body_rows);
        println!();
        println!("Wrote {} file(s) to {}", written.len(), target.display());
    }

    Ok(())
}

/// Overwrite JSON and CSV-directory inputs in place; a single CSV file
/// becomes a directory beside it, since one CSV cannot hold several sheets
fn default_output(input: &Path) -> PathBuf {
    let is_json = input.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if input.is_file() && !is_json {
        input.with_extension("")
    } else {
        input.to_path_buf()
    }
}

fn cmd_inspect(input: &Path, log_sheet: &str) -> tblshape_core::Result<()> {
    let workbook = load_workbook(input)?;
    let candidates = score_sheets(&workbook, log_sheet)?;

    let selected = best_candidate(&candidates).map(|(c, _)| c.sheet);

    println!("Sheets ({}):", candidates.len());
    for c in &candidates {
        let extent = c.extent.map(|r| r.address()).unwrap_or_else(|| "-".to_string());
        let score = c.score.map(|s| s.to_string()).unwrap_or_else(|| "skipped".to_string());
        let marker = if selected == Some(c.sheet) { " <-- selected" } else { "" };
        println!("  {} [{}] area {}{}", c.name, extent, score, marker);

        for region in workbook.list_regions(c.sheet)? {
            let info = workbook.region(region)?;
            println!("    table '{}' at {}", info.name, info.bounds.address());
        }
    }

    Ok(())
}

fn cmd_log(input: &Path, log_sheet: &str) -> tblshape_core::Result<()> {
    let workbook = load_workbook(input)?;
    let Some(log) = AuditLog::open(&workbook, log_sheet) else {
        println!("No audit sheet '{}'", log_sheet);
        return Ok(());
    };

    let records = log.records(&workbook)?;
    println!("{} ({} records):", log.name(), records.len());
    for record in &records {
        println!("  {}", record);
    }

    Ok(())
}

fn cmd_show(input: &Path, sheet_name: Option<&str>, limit: Option<usize>) -> tblshape_core::Result<()> {
    let workbook = load_workbook(input)?;
    let sheet = match sheet_name {
        Some(name) => workbook
            .get_sheet(name)
            .ok_or_else(|| tblshape_core::Error::SheetNotFound(name.to_string()))?,
        None => *workbook
            .list_sheets()
            .first()
            .ok_or_else(|| tblshape_core::Error::SheetNotFound("(first sheet)".to_string()))?,
    };

    let Some(extent) = workbook.occupied_extent(sheet)? else {
        println!("Sheet '{}' is empty", workbook.sheet_name(sheet)?);
        return Ok(());
    };

    print_grid(&workbook, sheet, extent, limit)
}

fn print_grid(workbook: &Workbook, sheet: SheetId, extent: Rect, limit: Option<usize>) -> tblshape_core::Result<()> {
    let rows = workbook.cell_values(sheet, extent)?;
    println!("Sheet: {} [{}]", workbook.sheet_name(sheet)?, extent.address());
    println!();

    let row_limit = limit.unwrap_or(rows.len());
    for row in rows.iter().take(row_limit) {
        let values: Vec<String> = row.iter().map(|c| c.to_string_value()).collect();
        println!("{}", values.join("\t"));
    }

    if rows.len() > row_limit {
        println!("... ({} more rows)", rows.len() - row_limit);
    }

    Ok(())
}

fn cmd_create_config(output: &Path) -> tblshape_core::Result<()> {
    PipelineConfig::default().save(output)?;
    println!("Created config: {}", output.display());
    println!();
    println!("Edit the file to change filters, column order, renames or names,");
    println!("then run: tblshape run --input <workbook> --config {}", output.display());
    Ok(())
}
