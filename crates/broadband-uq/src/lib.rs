//! Rural Broadband Uncertainty-Quantification Engine
//!
//! Estimates the capacity, total cost of ownership and lifecycle emissions of
//! rural 4G/5G macro base stations for population-density deciles, under
//! sampled engineering, cost and material assumptions.
//!
//! # Pipeline
//!
//! ```text
//! SimulationConfig ──expand──▶ ScenarioRecord × N ──Harness (rayon)──▶ result rows
//!                                  │                    │   │   │
//!                          VariationCache        capacity cost emissions
//!                                                       │
//!                              DecileTable / SiteCountTable (external aggregates)
//! ```
//!
//! | Stage     | Model module  | Needs aggregates | Output table                     |
//! |-----------|---------------|------------------|----------------------------------|
//! | Capacity  | [`capacity`]  | left join        | `mobile_capacity_results.csv`    |
//! | Cost      | [`cost`]      | required         | `mobile_cost_results.csv`        |
//! | Emission  | [`emissions`] | required         | `mobile_emission_results.csv`    |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub mod aggregates;
pub mod capacity;
pub mod config;
pub mod cost;
pub mod dimension;
pub mod emissions;
pub mod harness;
pub mod loader;
pub mod lut;
pub mod results;
pub mod sampler;
pub mod scenario;

pub use aggregates::{DecileAggregate, DecileTable, SiteCountTable};
pub use config::{SimulationConfig, TechnologyParams};
pub use harness::{Harness, HarnessConfig, Stage, StageOutcome};
pub use lut::SpectralEfficiencyTable;
pub use scenario::ScenarioRecord;

/// Number of population-density deciles
pub const DECILE_COUNT: u8 = 10;

#[derive(Error, Debug)]
pub enum UqError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Cannot locate input table {0:?}")]
    MissingInput(PathBuf),
    #[error("No spectral efficiency rows for technology {0}")]
    UnknownTechnology(Generation),
    #[error("Lookup table thresholds for {generation} not strictly increasing at row {row}")]
    NonMonotonicTable { generation: Generation, row: usize },
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Invalid range for {field}: low {low} > high {high}")]
    InvalidRange { field: String, low: f64, high: f64 },
    #[error("Cannot derive a legacy seed from seed {seed} at {frequency_mhz} MHz")]
    SeedDerivation { seed: u64, frequency_mhz: f64 },
    #[error("Iteration {iteration} outside random variation vector of {draws} draws")]
    IterationOutOfRange { iteration: usize, draws: usize },
    #[error("Invalid decile label: {0}")]
    InvalidDecile(String),
    #[error("Invalid cell generation: {0}")]
    InvalidGeneration(String),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error("Non-finite {quantity}: {value}")]
    NonFinite { quantity: &'static str, value: f64 },
    #[error("No aggregate data for {0}")]
    MissingAggregate(Decile),
    #[error("No site count for {0} / {1}")]
    MissingSiteCount(Decile, Generation),
}

impl UqError {
    /// Configuration errors abort a batch; everything else only excludes the
    /// offending record.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            UqError::InvalidRecord(_)
                | UqError::NonFinite { .. }
                | UqError::MissingAggregate(_)
                | UqError::MissingSiteCount(..)
        )
    }
}

pub type Result<T> = std::result::Result<T, UqError>;

/// Cellular technology generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Generation {
    #[serde(rename = "4G")]
    FourG,
    #[serde(rename = "5G")]
    FiveG,
}

impl Generation {
    pub const ALL: [Generation; 2] = [Generation::FourG, Generation::FiveG];

    pub fn label(&self) -> &'static str {
        match self {
            Generation::FourG => "4G",
            Generation::FiveG => "5G",
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Generation {
    type Err = UqError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "4G" | "LTE" => Ok(Generation::FourG),
            "5G" | "NR" => Ok(Generation::FiveG),
            other => Err(UqError::InvalidGeneration(other.to_string())),
        }
    }
}

/// Population-density decile, 1 = sparsest, 10 = densest.
///
/// Serialized as the label used by the aggregate tables ("Decile 7").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Decile(u8);

impl Decile {
    pub fn new(rank: u8) -> Result<Self> {
        if (1..=DECILE_COUNT).contains(&rank) {
            Ok(Decile(rank))
        } else {
            Err(UqError::InvalidDecile(rank.to_string()))
        }
    }

    pub fn rank(&self) -> u8 {
        self.0
    }

    /// All ten deciles in ascending density order
    pub fn all() -> Vec<Decile> {
        (1..=DECILE_COUNT).map(Decile).collect()
    }
}

impl fmt::Display for Decile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decile {}", self.0)
    }
}

impl FromStr for Decile {
    type Err = UqError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("Decile")
            .map(str::trim)
            .unwrap_or(trimmed);
        digits
            .parse::<u8>()
            .map_err(|_| UqError::InvalidDecile(s.to_string()))
            .and_then(Decile::new)
    }
}

impl TryFrom<String> for Decile {
    type Error = UqError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Decile> for String {
    fn from(decile: Decile) -> String {
        decile.to_string()
    }
}
