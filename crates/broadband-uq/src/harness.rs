//! Parallel evaluation harness
//!
//! Maps the capacity, cost and emission models over a scenario set on a
//! dedicated rayon pool. Each record is evaluated independently; results are
//! gathered at a single point after the parallel map.
//!
//! Fatal errors (configuration problems such as a technology missing from the
//! lookup table) abort the whole stage. Per-record errors exclude that record
//! and are counted by reason in the [`StageOutcome`].

use crate::aggregates::{DecileTable, SiteCountTable};
use crate::capacity;
use crate::cost;
use crate::emissions::{self, EmissionContext};
use crate::lut::SpectralEfficiencyTable;
use crate::results::{CapacityRow, CostRow, EmissionRow};
use crate::sampler::{SeedMode, VariationCache};
use crate::scenario::ScenarioRecord;
use crate::{Result, UqError};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;
use tracing::{info, warn};

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Worker threads in the evaluation pool
    pub workers: usize,
    /// Draw a progress bar on stderr
    pub progress: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus(),
            progress: false,
        }
    }
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.workers = n.max(1);
        self
    }

    pub fn progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Evaluation stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Capacity,
    Cost,
    Emission,
}

impl Stage {
    /// Result table written by the stage
    pub fn output_file(&self) -> &'static str {
        match self {
            Stage::Capacity => "mobile_capacity_results.csv",
            Stage::Cost => "mobile_cost_results.csv",
            Stage::Emission => "mobile_emission_results.csv",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Capacity => write!(f, "capacity"),
            Stage::Cost => write!(f, "cost"),
            Stage::Emission => write!(f, "emission"),
        }
    }
}

fn exclusion_reason(err: &UqError) -> &'static str {
    match err {
        UqError::InvalidRecord(_) => "invalid_record",
        UqError::NonFinite { .. } => "non_finite",
        UqError::MissingAggregate(_) => "missing_aggregate",
        UqError::MissingSiteCount(..) => "missing_site_count",
        _ => "other",
    }
}

/// Rows of one stage and what was left out
#[derive(Debug, Clone)]
pub struct StageOutcome<T> {
    pub stage: Stage,
    pub rows: Vec<T>,
    /// Excluded record count by reason
    pub excluded: BTreeMap<String, usize>,
    pub elapsed_ms: u64,
}

impl<T> StageOutcome<T> {
    pub fn excluded_total(&self) -> usize {
        self.excluded.values().sum()
    }

    pub fn summary(&self) -> StageSummary {
        StageSummary {
            stage: self.stage,
            rows_written: self.rows.len(),
            excluded_total: self.excluded_total(),
            excluded: self.excluded.clone(),
            elapsed_ms: self.elapsed_ms,
        }
    }
}

/// Serializable stage report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSummary {
    pub stage: Stage,
    pub rows_written: usize,
    pub excluded_total: usize,
    pub excluded: BTreeMap<String, usize>,
    pub elapsed_ms: u64,
}

/// Variation vectors for `records`, prepared in record order. Unseeded records
/// draw from `rng` one after another.
pub fn prepare_variations<R: Rng + ?Sized>(
    records: &[ScenarioRecord],
    mode: SeedMode,
    rng: &mut R,
) -> Result<VariationCache> {
    let mut cache = VariationCache::new(mode);
    for record in records {
        cache.prepare(record, rng)?;
    }
    info!(
        "Prepared {} random variation vectors ({:?} seeding)",
        cache.len(),
        mode
    );
    Ok(cache)
}

/// Parallel evaluator over a fixed lookup table
pub struct Harness {
    config: HarnessConfig,
    lut: SpectralEfficiencyTable,
    pool: rayon::ThreadPool,
}

impl Harness {
    pub fn new(config: HarnessConfig, lut: SpectralEfficiencyTable) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers.max(1))
            .build()
            .map_err(|e| UqError::InvalidParameter(format!("worker pool: {}", e)))?;
        Ok(Self { config, lut, pool })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn lut(&self) -> &SpectralEfficiencyTable {
        &self.lut
    }

    fn progress_bar(&self, stage: Stage, len: usize) -> ProgressBar {
        if !self.config.progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
        ) {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.set_message(format!("Processing {} results", stage));
        bar
    }

    fn run<T, F>(&self, stage: Stage, records: &[ScenarioRecord], eval: F) -> Result<StageOutcome<T>>
    where
        T: Send,
        F: Fn(&ScenarioRecord) -> Result<T> + Sync,
    {
        info!(
            "Running {} stage over {} records on {} workers",
            stage,
            records.len(),
            self.config.workers
        );
        let started = Instant::now();
        let bar = self.progress_bar(stage, records.len());

        let results: Vec<Result<T>> = self.pool.install(|| {
            records
                .par_iter()
                .progress_with(bar.clone())
                .map(|record| eval(record))
                .collect()
        });
        bar.finish_and_clear();

        let mut rows = Vec::with_capacity(results.len());
        let mut excluded: BTreeMap<String, usize> = BTreeMap::new();
        for result in results {
            match result {
                Ok(row) => rows.push(row),
                Err(e) if e.is_fatal() => {
                    warn!("{} stage aborted: {}", stage, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("{} record excluded: {}", stage, e);
                    *excluded.entry(exclusion_reason(&e).to_string()).or_default() += 1;
                }
            }
        }

        let outcome = StageOutcome {
            stage,
            rows,
            excluded,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            "{} stage: {} rows, {} excluded in {} ms",
            stage,
            outcome.rows.len(),
            outcome.excluded_total(),
            outcome.elapsed_ms
        );
        Ok(outcome)
    }

    /// Link budgets, left-joined with decile aggregates when given
    pub fn run_capacity(
        &self,
        records: &[ScenarioRecord],
        variations: &VariationCache,
        deciles: Option<&DecileTable>,
    ) -> Result<StageOutcome<CapacityRow>> {
        self.run(Stage::Capacity, records, |record| {
            let vector = variations.get(record).ok_or_else(|| {
                UqError::InvalidParameter(format!(
                    "no random variation vector prepared for {} MHz",
                    record.key.frequency_mhz
                ))
            })?;
            let budget = capacity::evaluate(record, &self.lut, &vector)?;
            let aggregate = deciles.and_then(|table| table.get(record.key.decile));
            Ok(CapacityRow::new(record, &budget, aggregate))
        })
    }

    /// Total cost of ownership; records without an aggregate or site count
    /// are excluded
    pub fn run_cost(
        &self,
        records: &[ScenarioRecord],
        deciles: &DecileTable,
        sites: &SiteCountTable,
    ) -> Result<StageOutcome<CostRow>> {
        self.run(Stage::Cost, records, |record| {
            let key = &record.key;
            let aggregate = deciles.require(key.decile)?;
            let count = sites.require(key.decile, key.generation)?;
            let breakdown = cost::evaluate(
                &record.cost,
                key.frequency_mhz,
                aggregate.mean_poor_connected,
                count,
            )?;
            Ok(CostRow::new(record, &breakdown, aggregate, count))
        })
    }

    /// Lifecycle emissions; records without an aggregate or site count are
    /// excluded
    pub fn run_emission(
        &self,
        records: &[ScenarioRecord],
        deciles: &DecileTable,
        sites: &SiteCountTable,
    ) -> Result<StageOutcome<EmissionRow>> {
        self.run(Stage::Emission, records, |record| {
            let key = &record.key;
            let aggregate = deciles.require(key.decile)?;
            let count = sites.require(key.decile, key.generation)?;
            let ctx = EmissionContext {
                users: aggregate.mean_poor_connected,
                distance_km: aggregate.mean_distance_km,
                maritime_km: aggregate.maritime_km,
                sites: count,
            };
            let breakdown = emissions::evaluate(&record.emission, &ctx)?;
            Ok(EmissionRow::new(record, &breakdown, aggregate, count))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregates::tests::aggregate;
    use crate::config::SimulationConfig;
    use crate::lut::LutRow;
    use crate::scenario::expand;
    use crate::{Decile, Generation};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde::Serialize;

    fn config() -> SimulationConfig {
        SimulationConfig {
            iterations: 3,
            demand_levels_gb: vec![30.0],
            deciles: vec![Decile::new(1).unwrap(), Decile::new(2).unwrap()],
            ..SimulationConfig::default()
        }
    }

    fn records() -> Vec<ScenarioRecord> {
        expand(&config(), &mut StdRng::seed_from_u64(10)).unwrap()
    }

    fn harness(workers: usize) -> Harness {
        Harness::new(
            HarnessConfig::new().workers(workers),
            SpectralEfficiencyTable::mimo(),
        )
        .unwrap()
    }

    fn as_sorted_json<T: Serialize>(rows: &[T]) -> Vec<String> {
        let mut out: Vec<String> = rows
            .iter()
            .map(|r| serde_json::to_string(r).unwrap())
            .collect();
        out.sort();
        out
    }

    #[test]
    fn test_capacity_left_join() {
        let records = records();
        let variations =
            prepare_variations(&records, SeedMode::Legacy, &mut StdRng::seed_from_u64(0)).unwrap();
        let deciles = DecileTable::from_rows(vec![aggregate(1)]).unwrap();

        let outcome = harness(2)
            .run_capacity(&records, &variations, Some(&deciles))
            .unwrap();
        assert_eq!(outcome.rows.len(), records.len());
        assert_eq!(outcome.excluded_total(), 0);
        for row in &outcome.rows {
            match row.decile.rank() {
                1 => assert_eq!(row.mean_poor_connected, Some(2500.0)),
                _ => assert_eq!(row.mean_poor_connected, None),
            }
            assert!(row.capacity_mbps > 0.0);
        }
    }

    #[test]
    fn test_worker_count_does_not_change_results() {
        let records = records();
        let variations =
            prepare_variations(&records, SeedMode::Full, &mut StdRng::seed_from_u64(0)).unwrap();
        let one = harness(1).run_capacity(&records, &variations, None).unwrap();
        let four = harness(4).run_capacity(&records, &variations, None).unwrap();
        assert_eq!(as_sorted_json(&one.rows), as_sorted_json(&four.rows));
    }

    #[test]
    fn test_unknown_technology_aborts() {
        let records = records();
        let variations =
            prepare_variations(&records, SeedMode::Legacy, &mut StdRng::seed_from_u64(0)).unwrap();
        let four_g_only: Vec<LutRow> = SpectralEfficiencyTable::mimo()
            .rows_for(Generation::FourG)
            .unwrap()
            .to_vec();
        let lut = SpectralEfficiencyTable::from_rows(four_g_only).unwrap();
        let harness = Harness::new(HarnessConfig::new().workers(2), lut).unwrap();

        let err = harness.run_capacity(&records, &variations, None).unwrap_err();
        assert!(matches!(err, UqError::UnknownTechnology(Generation::FiveG)));
    }

    #[test]
    fn test_missing_variation_vector_is_fatal() {
        let records = records();
        let empty = VariationCache::new(SeedMode::Legacy);
        assert!(harness(1).run_capacity(&records, &empty, None).is_err());
    }

    #[test]
    fn test_unseeded_variation_differs_across_scenarios() {
        let mut config = config();
        config.variation.seed = None;
        let records = expand(&config, &mut StdRng::seed_from_u64(10)).unwrap();
        let variations =
            prepare_variations(&records, config.seed_mode, &mut StdRng::seed_from_u64(5)).unwrap();
        let outcome = harness(2).run_capacity(&records, &variations, None).unwrap();

        let values: Vec<f64> = outcome
            .rows
            .iter()
            .filter(|r| {
                r.cell_generation == Generation::FourG
                    && r.frequency_mhz == 700.0
                    && r.iteration == 0
            })
            .map(|r| r.random_variation_db)
            .collect();
        assert!(values.len() > 1);
        assert!(values.iter().any(|v| *v != values[0]));

        let again =
            prepare_variations(&records, config.seed_mode, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(
            as_sorted_json(&outcome.rows),
            as_sorted_json(&harness(1).run_capacity(&records, &again, None).unwrap().rows)
        );
    }

    #[test]
    fn test_cost_excludes_missing_site_counts() {
        let records = records();
        let deciles = DecileTable::from_rows(vec![aggregate(1), aggregate(2)]).unwrap();
        let mut sites = SiteCountTable::default();
        sites.insert(Decile::new(1).unwrap(), Generation::FourG, 3);
        sites.insert(Decile::new(2).unwrap(), Generation::FourG, 5);

        let outcome = harness(2).run_cost(&records, &deciles, &sites).unwrap();
        let five_g = records
            .iter()
            .filter(|r| r.key.generation == Generation::FiveG)
            .count();
        assert_eq!(outcome.rows.len(), records.len() - five_g);
        assert_eq!(outcome.excluded.get("missing_site_count"), Some(&five_g));
        for row in &outcome.rows {
            let expected = if row.decile.rank() == 1 { 3.0 } else { 5.0 };
            assert!(
                (row.total_decile_tco_usd - expected * row.total_base_station_tco_usd).abs()
                    < 1e-6
            );
        }
        assert_eq!(outcome.summary().rows_written, outcome.rows.len());
    }

    #[test]
    fn test_emission_excludes_missing_aggregates() {
        let records = records();
        let deciles = DecileTable::from_rows(vec![aggregate(2)]).unwrap();
        let mut sites = SiteCountTable::default();
        for decile in [Decile::new(1).unwrap(), Decile::new(2).unwrap()] {
            for generation in Generation::ALL {
                sites.insert(decile, generation, 4);
            }
        }

        let outcome = harness(3).run_emission(&records, &deciles, &sites).unwrap();
        assert_eq!(outcome.rows.len(), records.len() / 2);
        assert_eq!(outcome.excluded.get("missing_aggregate"), Some(&(records.len() / 2)));
        for row in &outcome.rows {
            let phases = row.total_mfg_ghg_kg
                + row.total_trans_ghg_kg
                + row.total_construction_ghg_kg
                + row.total_operations_ghg_kg
                + row.total_eolt_ghg_kg;
            assert!((row.total_emissions_ghg_kg - phases).abs() <= 1e-9 * phases);
            assert_eq!(row.no_of_required_sites, 4);
        }
    }

    #[test]
    fn test_stage_files() {
        assert_eq!(Stage::Capacity.output_file(), "mobile_capacity_results.csv");
        assert_eq!(Stage::Emission.to_string(), "emission");
    }
}
