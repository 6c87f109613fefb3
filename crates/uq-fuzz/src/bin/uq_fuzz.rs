//! UQ engine fuzz runner
//!
//! Usage:
//!   uq-fuzz run [--cases N] [--seed S] [--output FORMAT]
//!   uq-fuzz list

use broadband_uq::capacity::path_loss_db;
use broadband_uq::config::SimulationConfig;
use broadband_uq::cost::total_cost_ownership;
use broadband_uq::emissions::{self, EmissionContext};
use broadband_uq::sampler::{random_variation, SeedMode, VariationParams};
use broadband_uq::scenario::expand;
use broadband_uq::{Decile, Generation, SpectralEfficiencyTable};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::Rng;
use std::process::ExitCode;
use uq_fuzz::reports::FuzzReport;
use uq_fuzz::runner::{FuzzConfig, FuzzRunner};

#[derive(Parser, Debug)]
#[command(name = "uq-fuzz", about = "Property fuzzing for the broadband UQ engine")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every fuzz target
    Run {
        /// Cases per target
        #[arg(long, default_value_t = 10_000)]
        cases: u64,

        /// Run seed
        #[arg(long, default_value_t = 0)]
        seed: u64,

        #[arg(long, value_enum, default_value_t = Output::Text)]
        output: Output,
    },
    /// List fuzz targets
    List,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Output {
    Text,
    Json,
    Markdown,
}

type Target = (&'static str, &'static str, fn(&mut StdRng) -> Result<(), String>);

const TARGETS: [Target; 6] = [
    ("efficiency_monotonic", "Spectral efficiency non-decreasing in CNR", efficiency_monotonic),
    ("efficiency_clamped", "Table extremes returned outside thresholds", efficiency_clamped),
    ("path_loss_monotonic", "Path loss grows with distance", path_loss_monotonic),
    ("tco_undiscounted", "Zero discount rate gives capex + opex x years", tco_undiscounted),
    ("emission_phases_sum", "Grand total equals the five phase totals", emission_phases_sum),
    ("variation_reproducible", "Seeded variation vectors repeat exactly", variation_reproducible),
];

fn main() -> ExitCode {
    let args = Args::parse();

    match args.command {
        Command::List => {
            println!("Available fuzz targets:");
            println!();
            for (name, about, _) in TARGETS {
                println!("  {:<24} {}", name, about);
            }
            ExitCode::SUCCESS
        }
        Command::Run { cases, seed, output } => {
            let config = FuzzConfig::new().cases(cases).seed(seed);
            eprintln!("UQ Fuzz Runner - {} cases per target, seed {}", cases, seed);

            let mut runner = FuzzRunner::new(config);
            for (name, _, target) in TARGETS {
                runner.run(name, target);
            }
            let report = FuzzReport::new(seed, runner.into_results());

            match output {
                Output::Json => println!("{}", report.to_json()),
                Output::Markdown => println!("{}", report.to_markdown()),
                Output::Text => report.print(),
            }

            if report.summary.targets_failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
    }
}

fn pick_generation(rng: &mut StdRng) -> Generation {
    if rng.gen_bool(0.5) {
        Generation::FourG
    } else {
        Generation::FiveG
    }
}

fn efficiency_monotonic(rng: &mut StdRng) -> Result<(), String> {
    let lut = SpectralEfficiencyTable::mimo();
    let generation = pick_generation(rng);
    let a = rng.gen_range(-40.0..60.0);
    let b = rng.gen_range(-40.0..60.0);
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let se_lo = lut.spectral_efficiency(generation, lo).map_err(|e| e.to_string())?;
    let se_hi = lut.spectral_efficiency(generation, hi).map_err(|e| e.to_string())?;
    if se_lo <= se_hi {
        Ok(())
    } else {
        Err(format!("{} at {} dB above {} at {} dB", se_lo, lo, se_hi, hi))
    }
}

fn efficiency_clamped(rng: &mut StdRng) -> Result<(), String> {
    let lut = SpectralEfficiencyTable::single_antenna();
    let generation = pick_generation(rng);
    let rows = lut.rows_for(generation).map_err(|e| e.to_string())?;
    let (first, last) = match (rows.first(), rows.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err("empty table".to_string()),
    };

    let below = first.threshold_db - rng.gen_range(0.001..100.0);
    let above = last.threshold_db + rng.gen_range(0.0..100.0);
    let se_below = lut.spectral_efficiency(generation, below).map_err(|e| e.to_string())?;
    let se_above = lut.spectral_efficiency(generation, above).map_err(|e| e.to_string())?;
    if se_below == first.spectral_efficiency && se_above == last.spectral_efficiency {
        Ok(())
    } else {
        Err(format!("{} dB -> {}, {} dB -> {}", below, se_below, above, se_above))
    }
}

fn path_loss_monotonic(rng: &mut StdRng) -> Result<(), String> {
    let f = rng.gen_range(150.0..3_500.0);
    let h_tx = rng.gen_range(10.0..80.0);
    let h_u = rng.gen_range(1.0..10.0);
    let var = rng.gen_range(0.0..40.0);
    let d1 = rng.gen_range(0.05..60.0);
    let d2 = d1 + rng.gen_range(0.01..20.0);
    let (pl1, pl2) = (path_loss_db(f, h_tx, h_u, d1, var), path_loss_db(f, h_tx, h_u, d2, var));
    if pl1 < pl2 {
        Ok(())
    } else {
        Err(format!("{} km -> {} dB, {} km -> {} dB", d1, pl1, d2, pl2))
    }
}

fn tco_undiscounted(rng: &mut StdRng) -> Result<(), String> {
    let capex = rng.gen_range(0.0..1_000_000.0);
    let opex = rng.gen_range(0.0..200_000.0);
    let years = rng.gen_range(1u32..=30);
    let tco = total_cost_ownership(capex, opex, 0.0, years);
    let expected = capex + opex * years as f64;
    if (tco - expected).abs() <= 1e-9 * expected.max(1.0) {
        Ok(())
    } else {
        Err(format!("{} != {}", tco, expected))
    }
}

fn emission_phases_sum(rng: &mut StdRng) -> Result<(), String> {
    let config = SimulationConfig {
        iterations: 1,
        demand_levels_gb: vec![30.0],
        deciles: Decile::new(rng.gen_range(1..=10)).into_iter().collect(),
        ..SimulationConfig::default()
    };
    let records = expand(&config, rng).map_err(|e| e.to_string())?;
    let record = records
        .get(rng.gen_range(0..records.len().max(1)))
        .ok_or_else(|| "no records".to_string())?;
    let ctx = EmissionContext {
        users: rng.gen_range(0.0..50_000.0),
        distance_km: rng.gen_range(0.0..500.0),
        maritime_km: rng.gen_bool(0.5).then(|| rng.gen_range(0.0..20_000.0)),
        sites: rng.gen_range(0..5_000),
    };

    let b = emissions::evaluate(&record.emission, &ctx).map_err(|e| e.to_string())?;
    let phases = b.total_mfg_ghg_kg
        + b.total_trans_ghg_kg
        + b.total_construction_ghg_kg
        + b.total_operations_ghg_kg
        + b.total_eolt_ghg_kg;
    if (b.total_emissions_ghg_kg - phases).abs() <= 1e-9 * phases.abs().max(1.0) {
        Ok(())
    } else {
        Err(format!("{} != {}", b.total_emissions_ghg_kg, phases))
    }
}

fn variation_reproducible(rng: &mut StdRng) -> Result<(), String> {
    let params = VariationParams {
        mu: rng.gen_range(0.5..10.0),
        sigma: rng.gen_range(0.0..20.0),
        seed: Some(rng.gen_range(1..1_000)),
        draws: rng.gen_range(1..200),
    };
    let frequency = [600.0, 700.0, 800.0, 1800.0, 2600.0, 3500.0][rng.gen_range(0..6)];
    let mode = if rng.gen_bool(0.5) { SeedMode::Legacy } else { SeedMode::Full };

    let first = random_variation(frequency, &params, mode, rng).map_err(|e| e.to_string())?;
    let second = random_variation(frequency, &params, mode, rng).map_err(|e| e.to_string())?;
    if first == second {
        Ok(())
    } else {
        Err(format!("{:?} at {} MHz not reproducible", params, frequency))
    }
}
