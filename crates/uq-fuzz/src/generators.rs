//! Strategies for engine inputs
//!
//! Scalar strategies cover the physically meaningful ranges of the link
//! budget and cost models. Record strategies run the real expansion with a
//! generated seed so every field respects the configured sampling ranges.

use broadband_uq::config::SimulationConfig;
use broadband_uq::emissions::EmissionContext;
use broadband_uq::sampler::{SeedMode, VariationParams};
use broadband_uq::scenario::{expand, ScenarioRecord};
use broadband_uq::{Decile, Generation};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

// ============================================================================
// Radio
// ============================================================================

/// CNR/SINR in dB, wider than any lookup table
pub fn cnr_db() -> impl Strategy<Value = f64> {
    -40.0f64..60.0
}

/// Carrier frequency, MHz (Hata-Okamura validity range)
pub fn frequency_mhz() -> impl Strategy<Value = f64> {
    150.0f64..=3_500.0
}

/// Transmitter height, m
pub fn transmitter_height_m() -> impl Strategy<Value = f64> {
    10.0f64..=80.0
}

/// User antenna height, m
pub fn user_height_m() -> impl Strategy<Value = f64> {
    1.0f64..=10.0
}

/// Link distance, km
pub fn distance_km() -> impl Strategy<Value = f64> {
    0.05f64..=60.0
}

/// Random variation, dB
pub fn variation_db() -> impl Strategy<Value = f64> {
    0.0f64..=40.0
}

pub fn generation() -> impl Strategy<Value = Generation> {
    prop_oneof![Just(Generation::FourG), Just(Generation::FiveG)]
}

pub fn decile() -> impl Strategy<Value = Decile> {
    (1u8..=10).prop_filter_map("decile rank", |rank| Decile::new(rank).ok())
}

// ============================================================================
// Sampler
// ============================================================================

pub fn seed_mode() -> impl Strategy<Value = SeedMode> {
    prop_oneof![Just(SeedMode::Legacy), Just(SeedMode::Full)]
}

/// Seeded variation parameters around the model defaults
pub fn variation_params() -> impl Strategy<Value = VariationParams> {
    (0.5f64..10.0, 0.0f64..20.0, 1u64..1_000, 1usize..200).prop_map(
        |(mu, sigma, seed, draws)| VariationParams {
            mu,
            sigma,
            seed: Some(seed),
            draws,
        },
    )
}

// ============================================================================
// Cost
// ============================================================================

/// (capex, annual opex, discount rate %, assessment years)
pub fn tco_inputs() -> impl Strategy<Value = (f64, f64, f64, u32)> {
    (
        0.0f64..1_000_000.0,
        0.0f64..200_000.0,
        0.0f64..25.0,
        1u32..=30,
    )
}

// ============================================================================
// Records
// ============================================================================

fn small_config() -> SimulationConfig {
    SimulationConfig {
        iterations: 2,
        demand_levels_gb: vec![30.0],
        deciles: Decile::new(5).into_iter().collect(),
        ..SimulationConfig::default()
    }
}

/// A record sampled from the default configuration
pub fn scenario_record() -> impl Strategy<Value = ScenarioRecord> {
    (any::<u64>(), 0usize..8).prop_filter_map("expansion produced no record", |(seed, pick)| {
        let records = expand(&small_config(), &mut StdRng::seed_from_u64(seed)).ok()?;
        let index = pick % records.len().max(1);
        records.into_iter().nth(index)
    })
}

/// Decile-level inputs for the emission phases
pub fn emission_context() -> impl Strategy<Value = EmissionContext> {
    (
        0.0f64..50_000.0,
        0.0f64..500.0,
        proptest::option::of(0.0f64..20_000.0),
        0u64..5_000,
    )
        .prop_map(|(users, distance_km, maritime_km, sites)| EmissionContext {
            users,
            distance_km,
            maritime_km,
            sites,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn record_fields_in_range(record in scenario_record()) {
            prop_assert!(record.radio.transmitter_height_m >= 30.0);
            prop_assert!(record.radio.transmitter_height_m <= 50.0);
            prop_assert!(record.cost.staff_costs_usd >= 20_000.0);
            prop_assert_eq!(record.key.decile.rank(), 5);
        }

        #[test]
        fn decile_strategy_valid(d in decile()) {
            prop_assert!((1..=10).contains(&d.rank()));
        }
    }
}
