use anyhow::{Context, Result};
use cagewatch_core::{file_store::DirectoryStore, service::MetricsService};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::record::RecordCommand;
use crate::report::OutputFormat;

mod config;
mod record;
mod report;

/// Production metrics for aquaculture cages.
#[derive(Debug, Parser)]
#[command(name = "cagewatch", version, about)]
struct Cli {
    /// Config file (defaults to ./farm.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides the farm data directory from the config
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Overrides the report output directory from the config
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Computes snapshots for every unit (or the ones given) and writes a CSV log
    Report {
        #[arg(long = "unit")]
        units: Vec<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
        /// Print only; skip the CSV log
        #[arg(long)]
        no_log: bool,
    },
    /// Prints one unit's snapshot as JSON
    Show { unit: String },
    /// Validates a new entry and appends it to the unit's event log
    #[command(subcommand)]
    Record(RecordCommand),
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(output_dir) = cli.output_dir {
        config.output_dir = output_dir;
    }

    let store = DirectoryStore::open(&config.data_dir)
        .with_context(|| format!("Failed to open farm data in {:?}", config.data_dir))?;
    for unit_id in store.unavailable_units() {
        log::warn!("Event log for '{}' could not be loaded; its metrics are unavailable", unit_id);
    }
    let service = MetricsService::with_thresholds(store, config.thresholds);

    match cli.command {
        Commands::Report { units, format, no_log } => {
            let output_dir = (!no_log).then_some(config.output_dir.as_path());
            report::run_report(service.source(), &units, service.cache().thresholds(), format, output_dir)?;
        }
        Commands::Show { unit } => {
            let snapshot = service
                .snapshot(&unit)
                .with_context(|| format!("Failed to compute snapshot for '{}'", unit))?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Record(command) => {
            let snapshot = command
                .apply(&service)
                .with_context(|| format!("Rejected entry for '{}'", command.unit_id()))?;
            print!("{}", report::render_table(std::slice::from_ref(&snapshot)));
        }
    }

    Ok(())
}
