//! Rural broadband uncertainty-quantification runner
//!
//! Usage:
//!   run-uq expand --config config.json --output data/intermediate/scenarios.json
//!   run-uq dimension --scenarios data/intermediate/scenarios.json \
//!                    --deciles data/processed/decile_aggregates.csv \
//!                    --output data/processed/site_counts.csv
//!   run-uq run --config config.json --deciles data/processed/decile_aggregates.csv \
//!              --sites data/processed/site_counts.csv --output-dir results

use anyhow::Result;
use broadband_uq::aggregates::{DecileTable, SiteCountTable};
use broadband_uq::harness::{prepare_variations, Stage, StageSummary};
use broadband_uq::sampler::SeedMode;
use broadband_uq::{
    dimension, loader, Harness, HarnessConfig, ScenarioRecord, SimulationConfig,
    SpectralEfficiencyTable, UqError,
};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(
    name = "run-uq",
    about = "Capacity, cost and emissions uncertainty runs for rural 4G/5G networks"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Worker threads (default: available parallelism)
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    /// Show a progress bar per stage
    #[arg(long, global = true)]
    progress: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Expand the configuration into a scenario table
    Expand {
        /// Simulation configuration JSON (defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Scenario table to write
        #[arg(short, long, default_value = "data/intermediate/scenarios.json")]
        output: PathBuf,
    },

    /// Derive site counts per decile and generation from capacity results
    Dimension {
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Scenario table (expanded from the configuration when omitted; must exist when given)
        #[arg(short, long)]
        scenarios: Option<PathBuf>,

        /// Spectral efficiency table CSV (built-in table when omitted)
        #[arg(long)]
        lut: Option<PathBuf>,

        /// Decile aggregate table
        #[arg(short, long, default_value = "data/processed/decile_aggregates.csv")]
        deciles: PathBuf,

        /// Site count table to write
        #[arg(short, long, default_value = "data/processed/site_counts.csv")]
        output: PathBuf,
    },

    /// Run the capacity, cost and emission stages
    Run {
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Scenario table (expanded from the configuration when omitted; must exist when given)
        #[arg(short, long)]
        scenarios: Option<PathBuf>,

        #[arg(long)]
        lut: Option<PathBuf>,

        #[arg(short, long, default_value = "data/processed/decile_aggregates.csv")]
        deciles: PathBuf,

        /// Site count table; derived from the capacity stage when absent
        #[arg(long, default_value = "data/processed/site_counts.csv")]
        sites: PathBuf,

        /// Directory for result tables and the run report
        #[arg(short, long, default_value = "results")]
        output_dir: PathBuf,
    },
}

#[derive(Debug, Serialize)]
struct SkippedStage {
    stage: Stage,
    reason: String,
}

#[derive(Debug, Serialize)]
struct RunReport {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    records: usize,
    seed_mode: SeedMode,
    workers: usize,
    stages: Vec<StageSummary>,
    skipped: Vec<SkippedStage>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{}", "=".repeat(60));
    info!("Rural Broadband UQ Runner");
    info!("{}", "=".repeat(60));

    let mut harness_config = HarnessConfig::new().progress(args.progress);
    if let Some(workers) = args.workers {
        harness_config = harness_config.workers(workers);
    }

    match args.command {
        Command::Expand { config, output } => {
            let config = load_config(config.as_deref())?;
            let records = scenarios(&config, None)?;
            loader::save_scenarios(&output, &records)?;
        }
        Command::Dimension {
            config,
            scenarios: scenario_path,
            lut,
            deciles,
            output,
        } => {
            let config = load_config(config.as_deref())?;
            let records = scenarios(&config, scenario_path.as_deref())?;
            let harness = Harness::new(harness_config, lookup_table(&config, lut.as_deref())?)?;
            let deciles = DecileTable::from_csv(&deciles)?;

            let variations = prepare_variations(
                &records,
                config.seed_mode,
                &mut StdRng::seed_from_u64(config.sampling_seed),
            )?;
            let capacity = harness.run_capacity(&records, &variations, Some(&deciles))?;
            let sites = dimension::required_sites(&capacity.rows, &deciles, &config.demand)?;
            loader::write_csv(&output, &sites.rows())?;
        }
        Command::Run {
            config,
            scenarios: scenario_path,
            lut,
            deciles,
            sites,
            output_dir,
        } => {
            let config = load_config(config.as_deref())?;
            let records = scenarios(&config, scenario_path.as_deref())?;
            let harness = Harness::new(harness_config, lookup_table(&config, lut.as_deref())?)?;
            run_stages(&harness, &config, &records, &deciles, &sites, &output_dir)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SimulationConfig> {
    match path {
        Some(path) => Ok(SimulationConfig::load(path)?),
        None => {
            info!("No configuration given, using defaults");
            let config = SimulationConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

fn scenarios(config: &SimulationConfig, path: Option<&Path>) -> Result<Vec<ScenarioRecord>> {
    match path {
        Some(path) => Ok(loader::load_scenarios(path)?),
        None => {
            let mut rng = StdRng::seed_from_u64(config.sampling_seed);
            Ok(broadband_uq::scenario::expand(config, &mut rng)?)
        }
    }
}

fn lookup_table(config: &SimulationConfig, path: Option<&Path>) -> Result<SpectralEfficiencyTable> {
    match path {
        Some(path) => Ok(SpectralEfficiencyTable::from_csv(path)?),
        None => Ok(SpectralEfficiencyTable::for_variant(config.lut_variant)),
    }
}

/// `None` when the table file is absent, so the stages needing it can be skipped
fn optional<T>(loaded: broadband_uq::Result<T>) -> Result<Option<T>> {
    match loaded {
        Ok(table) => Ok(Some(table)),
        Err(UqError::MissingInput(path)) => {
            warn!("Input table {:?} not found", path);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn run_stages(
    harness: &Harness,
    config: &SimulationConfig,
    records: &[ScenarioRecord],
    deciles_path: &Path,
    sites_path: &Path,
    output_dir: &Path,
) -> Result<()> {
    let started_at = Utc::now();
    let mut stages = Vec::new();
    let mut skipped = Vec::new();

    let deciles = optional(DecileTable::from_csv(deciles_path))?;
    let mut sites = optional(SiteCountTable::from_csv(sites_path))?;

    // Capacity
    let variations = prepare_variations(
        records,
        config.seed_mode,
        &mut StdRng::seed_from_u64(config.sampling_seed),
    )?;
    let capacity = harness.run_capacity(records, &variations, deciles.as_ref())?;
    loader::write_csv(&output_dir.join(Stage::Capacity.output_file()), &capacity.rows)?;
    stages.push(capacity.summary());

    if sites.is_none() {
        if let Some(deciles) = &deciles {
            info!("Deriving site counts from capacity results");
            let derived = dimension::required_sites(&capacity.rows, deciles, &config.demand)?;
            loader::write_csv(&output_dir.join("mobile_site_counts.csv"), &derived.rows())?;
            sites = Some(derived);
        }
    }

    // Cost and emissions
    match (&deciles, &sites) {
        (Some(deciles), Some(sites)) => {
            let cost = harness.run_cost(records, deciles, sites)?;
            loader::write_csv(&output_dir.join(Stage::Cost.output_file()), &cost.rows)?;
            stages.push(cost.summary());

            let emission = harness.run_emission(records, deciles, sites)?;
            loader::write_csv(&output_dir.join(Stage::Emission.output_file()), &emission.rows)?;
            stages.push(emission.summary());
        }
        _ => {
            let reason = format!(
                "decile aggregates ({:?}) or site counts ({:?}) unavailable",
                deciles_path, sites_path
            );
            for stage in [Stage::Cost, Stage::Emission] {
                warn!("Skipping {} stage: {}", stage, reason);
                skipped.push(SkippedStage { stage, reason: reason.clone() });
            }
        }
    }

    let report = RunReport {
        run_id: Uuid::new_v4(),
        started_at,
        finished_at: Utc::now(),
        records: records.len(),
        seed_mode: config.seed_mode,
        workers: harness.config().workers,
        stages,
        skipped,
    };
    let report_path = output_dir.join("run_report.json");
    loader::write_json(&report_path, &report)?;

    // Summary
    info!("{}", "=".repeat(60));
    info!("SUMMARY (run {})", report.run_id);
    info!("{}", "=".repeat(60));
    for stage in &report.stages {
        info!(
            "  {:<10} {:>8} rows  {:>6} excluded  {:>8} ms",
            stage.stage.to_string(),
            stage.rows_written,
            stage.excluded_total,
            stage.elapsed_ms
        );
    }
    for stage in &report.skipped {
        info!("  {:<10} skipped", stage.stage.to_string());
    }
    info!("Report written to {:?}", report_path);

    Ok(())
}
