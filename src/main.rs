use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};

use schedule_reconcile::{
    compare_stored, output, ComparisonRequest, Config, FileVersionStore, IngestRequest, Ingestor,
    PeriodKey, ScheduleError, VersionId, VersionStore, Workbook,
};

#[derive(Parser)]
#[command(name = "schedule-reconcile")]
#[command(about = "Physician work-schedule ingestion and version comparison")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
    
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a schedule workbook and store it as a new version
    Ingest {
        /// Workbook file (xlsx, xls, ods or csv)
        #[arg(short, long)]
        input: PathBuf,
        
        #[arg(long)]
        hospital: String,
        
        #[arg(long)]
        year: i32,
        
        #[arg(long)]
        month: u32,
        
        /// Version label
        #[arg(short, long)]
        label: String,
        
        /// Version store directory
        #[arg(short, long)]
        store: PathBuf,
    },
    
    /// Compare two stored versions
    Compare {
        #[arg(short, long)]
        store: PathBuf,
        
        #[arg(long)]
        baseline: String,
        
        #[arg(long)]
        updated: String,
        
        /// Only compare physicians of this branch
        #[arg(long)]
        branch: Option<String>,
        
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
        
        /// Also write a markdown report
        #[arg(long)]
        report: bool,
    },
    
    /// List stored versions
    List {
        #[arg(short, long)]
        store: PathBuf,
        
        #[arg(long, requires_all = ["year", "month"])]
        hospital: Option<String>,
        
        #[arg(long)]
        year: Option<i32>,
        
        #[arg(long)]
        month: Option<u32>,
    },
    
    /// Write the per-physician summary of one version
    Summary {
        #[arg(short, long)]
        store: PathBuf,
        
        #[arg(long)]
        version: String,
        
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    
    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }
    
    let config = match &cli.config {
        Some(path) => {
            let config = Config::from_file(path)
                .with_context(|| format!("Failed to load configuration from {:?}", path))?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::default(),
    };
    
    match cli.command {
        Command::Ingest { input, hospital, year, month, label, store } => {
            ingest(&config, &input, PeriodKey::new(hospital, year, month)?, label, &store).await
        }
        Command::Compare { store, baseline, updated, branch, output, report } => {
            let request = ComparisonRequest {
                baseline: VersionId::parse(&baseline)?,
                updated: VersionId::parse(&updated)?,
                branch_filter: branch,
            };
            compare(&config, &store, &request, &output, report).await
        }
        Command::List { store, hospital, year, month } => {
            let period = match (hospital, year, month) {
                (Some(hospital), Some(year), Some(month)) => Some(PeriodKey::new(hospital, year, month)?),
                _ => None,
            };
            list(&store, period.as_ref()).await
        }
        Command::Summary { store, version, output } => {
            summary(&store, &VersionId::parse(&version)?, &output).await
        }
    }
}

async fn ingest(config: &Config, input: &Path, period: PeriodKey, label: String, store_dir: &Path) -> anyhow::Result<()> {
    let workbook = Workbook::from_path(input)
        .with_context(|| format!("Failed to read workbook {:?}", input))?;
    
    let source_file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let request = IngestRequest { period, label, source_file_name };
    
    let version = match Ingestor::new(config.clone()).ingest(&workbook, request) {
        Ok(version) => version,
        Err(ScheduleError::EmptyWorkbook(diagnostics)) => {
            warn!("No data found in {:?}", input);
            println!("{}", serde_json::to_string_pretty(&diagnostics)?);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    
    let store = FileVersionStore::new(store_dir);
    let id = store.put(version.clone()).await?;
    info!("Version '{}' stored with {} physicians", version.label, version.physicians.len());
    
    println!("{}", id);
    println!("{}", serde_json::to_string_pretty(&version.diagnostics)?);
    Ok(())
}

async fn compare(
    config: &Config,
    store_dir: &Path,
    request: &ComparisonRequest,
    output_dir: &Path,
    report: bool,
) -> anyhow::Result<()> {
    let store = FileVersionStore::new(store_dir);
    
    let Some(result) = compare_stored(&store, request, config).await else {
        println!("Nothing to compare: one or both versions are unavailable");
        return Ok(());
    };
    
    // Create output directory if it doesn't exist
    std::fs::create_dir_all(output_dir)?;
    
    output::save_comparison(&result, output_dir)?;
    if report {
        output::generate_report(&result, output_dir)?;
    }
    
    info!(
        "{} physicians changed, capacity {:.1} -> {:.1}",
        result.per_physician_deltas.len(),
        result.total_baseline_capacity,
        result.total_updated_capacity
    );
    Ok(())
}

async fn list(store_dir: &Path, period: Option<&PeriodKey>) -> anyhow::Result<()> {
    let store = FileVersionStore::new(store_dir);
    for header in store.list(period).await? {
        println!(
            "{}  {}  {}  {}  ({} physicians, {})",
            header.id,
            header.period,
            header.label,
            header.created_at.format("%Y-%m-%d %H:%M"),
            header.physician_count,
            header.source_file_name
        );
    }
    Ok(())
}

async fn summary(store_dir: &Path, id: &VersionId, output_dir: &Path) -> anyhow::Result<()> {
    let store = FileVersionStore::new(store_dir);
    let version = store
        .get(id)
        .await?
        .with_context(|| format!("Version {} not found", id))?;
    
    std::fs::create_dir_all(output_dir)?;
    output::save_version_summary(&version, output_dir)?;
    Ok(())
}
