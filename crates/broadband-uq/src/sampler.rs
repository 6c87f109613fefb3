//! Stochastic sampling
//!
//! Two kinds of draws feed scenario records:
//! - a log-normal random-variation vector per carrier frequency, added to the
//!   path loss at `vector[iteration]`
//! - independent uniform draws for every bounded engineering, cost and
//!   material field
//!
//! Every draw takes an explicitly owned generator. Nothing here touches a
//! process-wide RNG, so records can be expanded and evaluated on any thread.
//!
//! # Legacy seeding
//!
//! The reference pipeline re-seeds its generator from the first two characters
//! of the decimal rendering of `seed * frequency_hz * 100`. Only seeds 10..=99
//! can come out of that, and some products (below 10, or 1e16 and above, which
//! render in exponent form) produce no seed at all. [`SeedMode::Legacy`] keeps
//! that scheme for comparisons against earlier results; [`SeedMode::Full`]
//! mixes the full seed and frequency into a 64-bit seed.

use crate::scenario::{ScenarioKey, ScenarioRecord};
use crate::{Decile, Generation, Result, UqError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// How a (seed, frequency) pair becomes a generator seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedMode {
    /// First two digits of `seed * frequency_hz * 100`
    #[default]
    Legacy,
    /// 64-bit mix of seed and frequency
    Full,
}

/// Parameters of one random-variation vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariationParams {
    /// Mean of the log-normal distribution
    pub mu: f64,
    /// Standard deviation of the log-normal distribution
    pub sigma: f64,
    /// `None` draws from the caller's generator without re-seeding
    pub seed: Option<u64>,
    pub draws: usize,
}

impl Default for VariationParams {
    fn default() -> Self {
        Self {
            mu: 2.0,
            sigma: 10.0,
            seed: Some(42),
            draws: 100,
        }
    }
}

/// Integer parsed from the first two characters of `value` rendered the way
/// the reference pipeline renders floats (shortest round-trip digits, `.0`
/// suffix on integral values, exponent form below 1e-4 and from 1e16).
pub fn legacy_seed_prefix(value: f64) -> Option<u64> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }

    let magnitude = value.abs();
    let rendered = if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        format!("{:e}", value)
    } else {
        let plain = format!("{}", value);
        if plain.contains('.') {
            plain
        } else {
            format!("{}.0", plain)
        }
    };

    rendered.get(..2)?.parse::<u64>().ok()
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Generator seed for a frequency-specific variation vector
pub fn derive_seed(seed: u64, frequency_mhz: f64, mode: SeedMode) -> Result<u64> {
    if !(frequency_mhz.is_finite() && frequency_mhz > 0.0) {
        return Err(UqError::InvalidParameter(format!(
            "frequency must be positive, got {} MHz",
            frequency_mhz
        )));
    }

    let frequency_hz = frequency_mhz * 1e6;
    match mode {
        SeedMode::Legacy => {
            let product = seed as f64 * frequency_hz * 100.0;
            legacy_seed_prefix(product).ok_or(UqError::SeedDerivation {
                seed,
                frequency_mhz,
            })
        }
        SeedMode::Full => Ok(splitmix64(seed ^ splitmix64(frequency_hz.to_bits()))),
    }
}

/// Draw `draws` log-normal samples whose distribution has mean `mu` and
/// standard deviation `sigma`.
///
/// The underlying normal has std `sqrt(log10(1 + (sigma/mu)^2))` and mean
/// `log10(mu) - std^2 / 2`.
pub fn draw_log_normal<R: Rng + ?Sized>(
    rng: &mut R,
    mu: f64,
    sigma: f64,
    draws: usize,
) -> Result<Vec<f64>> {
    if !(mu.is_finite() && mu > 0.0) {
        return Err(UqError::InvalidParameter(format!(
            "log-normal mu must be positive, got {}",
            mu
        )));
    }
    if !(sigma.is_finite() && sigma >= 0.0) {
        return Err(UqError::InvalidParameter(format!(
            "log-normal sigma must be non-negative, got {}",
            sigma
        )));
    }

    let normal_std = (1.0 + (sigma / mu).powi(2)).log10().sqrt();
    let normal_mean = mu.log10() - normal_std.powi(2) / 2.0;
    let dist = LogNormal::new(normal_mean, normal_std)
        .map_err(|e| UqError::InvalidParameter(format!("log-normal: {}", e)))?;

    Ok((0..draws).map(|_| dist.sample(rng)).collect())
}

/// Random-variation vector for one carrier frequency.
///
/// A seeded request builds its own generator from [`derive_seed`]; an
/// unseeded one draws from `unseeded`.
pub fn random_variation<R: Rng + ?Sized>(
    frequency_mhz: f64,
    params: &VariationParams,
    mode: SeedMode,
    unseeded: &mut R,
) -> Result<Vec<f64>> {
    match params.seed {
        Some(seed) => {
            let derived = derive_seed(seed, frequency_mhz, mode)?;
            debug!(
                "Variation seed {} for {} MHz (seed {}, {:?})",
                derived, frequency_mhz, seed, mode
            );
            let mut rng = StdRng::seed_from_u64(derived);
            draw_log_normal(&mut rng, params.mu, params.sigma, params.draws)
        }
        None => draw_log_normal(unseeded, params.mu, params.sigma, params.draws),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VariationKey {
    frequency_bits: u64,
    mu_bits: u64,
    sigma_bits: u64,
    seed: Option<u64>,
    draws: usize,
}

impl VariationKey {
    fn new(frequency_mhz: f64, params: &VariationParams) -> Self {
        Self {
            frequency_bits: frequency_mhz.to_bits(),
            mu_bits: params.mu.to_bits(),
            sigma_bits: params.sigma.to_bits(),
            seed: params.seed,
            draws: params.draws,
        }
    }
}

/// Scenario fields that identify one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RecordKey {
    decile: Decile,
    generation: Generation,
    frequency_bits: u64,
    bandwidth_bits: u64,
    demand_bits: u64,
    iteration: usize,
}

impl RecordKey {
    fn new(key: &ScenarioKey) -> Self {
        Self {
            decile: key.decile,
            generation: key.generation,
            frequency_bits: key.frequency_mhz.to_bits(),
            bandwidth_bits: key.channel_bandwidth_mhz.to_bits(),
            demand_bits: key.demand_gb_month.to_bits(),
            iteration: key.iteration,
        }
    }
}

/// Random-variation vectors for a scenario set, shared read-only across
/// workers.
///
/// Seeded vectors are computed once per distinct (frequency, parameters) and
/// shared by every record that uses them. An unseeded record gets a vector of
/// its own, drawn from the run generator when the record is prepared; records
/// with identical keys share it.
#[derive(Debug, Clone, Default)]
pub struct VariationCache {
    shared: HashMap<VariationKey, Arc<Vec<f64>>>,
    per_record: HashMap<RecordKey, Arc<Vec<f64>>>,
    mode: SeedMode,
}

impl VariationCache {
    pub fn new(mode: SeedMode) -> Self {
        Self {
            shared: HashMap::new(),
            per_record: HashMap::new(),
            mode,
        }
    }

    /// Make sure a vector exists for `record`
    pub fn prepare<R: Rng + ?Sized>(
        &mut self,
        record: &ScenarioRecord,
        unseeded: &mut R,
    ) -> Result<()> {
        let frequency_mhz = record.key.frequency_mhz;
        let params = &record.variation;
        if params.seed.is_some() {
            let key = VariationKey::new(frequency_mhz, params);
            if !self.shared.contains_key(&key) {
                let vector = random_variation(frequency_mhz, params, self.mode, unseeded)?;
                self.shared.insert(key, Arc::new(vector));
            }
        } else {
            let key = RecordKey::new(&record.key);
            if !self.per_record.contains_key(&key) {
                let vector = random_variation(frequency_mhz, params, self.mode, unseeded)?;
                self.per_record.insert(key, Arc::new(vector));
            }
        }
        Ok(())
    }

    pub fn get(&self, record: &ScenarioRecord) -> Option<Arc<Vec<f64>>> {
        match record.variation.seed {
            Some(_) => self
                .shared
                .get(&VariationKey::new(record.key.frequency_mhz, &record.variation)),
            None => self.per_record.get(&RecordKey::new(&record.key)),
        }
        .cloned()
    }

    pub fn len(&self) -> usize {
        self.shared.len() + self.per_record.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.is_empty() && self.per_record.is_empty()
    }
}

/// Inclusive integer range for count-like and engineering fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub low: i64,
    pub high: i64,
}

impl IntRange {
    pub const fn new(low: i64, high: i64) -> Self {
        Self { low, high }
    }

    pub const fn fixed(value: i64) -> Self {
        Self {
            low: value,
            high: value,
        }
    }

    pub fn validate(&self, field: &str) -> Result<()> {
        if self.low > self.high {
            return Err(UqError::InvalidRange {
                field: field.to_string(),
                low: self.low as f64,
                high: self.high as f64,
            });
        }
        Ok(())
    }

    /// Uniform draw over `[low, high]`. The range must be valid.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.low..=self.high) as f64
    }
}

/// Inclusive continuous range for fractional masses and energies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatRange {
    pub low: f64,
    pub high: f64,
}

impl FloatRange {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub const fn fixed(value: f64) -> Self {
        Self {
            low: value,
            high: value,
        }
    }

    pub fn validate(&self, field: &str) -> Result<()> {
        if !(self.low.is_finite() && self.high.is_finite()) || self.low > self.high {
            return Err(UqError::InvalidRange {
                field: field.to_string(),
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }

    /// Uniform draw over `[low, high]`. The range must be valid.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.low..=self.high)
    }
}
