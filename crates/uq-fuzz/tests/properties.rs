//! Model properties over generated inputs

use broadband_uq::capacity::{self, path_loss_db};
use broadband_uq::cost::total_cost_ownership;
use broadband_uq::emissions;
use broadband_uq::harness::{prepare_variations, Harness, HarnessConfig};
use broadband_uq::lut::TableVariant;
use broadband_uq::sampler::{random_variation, VariationParams};
use broadband_uq::scenario::expand;
use broadband_uq::SimulationConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;
use uq_fuzz::prelude::*;

fn table(variant: TableVariant) -> SpectralEfficiencyTable {
    SpectralEfficiencyTable::for_variant(variant)
}

fn variant() -> impl Strategy<Value = TableVariant> {
    prop_oneof![Just(TableVariant::SingleAntenna), Just(TableVariant::Mimo)]
}

proptest! {
    #[test]
    fn efficiency_non_decreasing(
        variant in variant(),
        generation in generation(),
        a in cnr_db(),
        b in cnr_db(),
    ) {
        let lut = table(variant);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let se_lo = lut.spectral_efficiency(generation, lo).unwrap();
        let se_hi = lut.spectral_efficiency(generation, hi).unwrap();
        prop_assert!(se_lo <= se_hi);
    }

    #[test]
    fn efficiency_clamped_to_table(
        variant in variant(),
        generation in generation(),
        margin in 0.001f64..100.0,
    ) {
        let lut = table(variant);
        let rows = lut.rows_for(generation).unwrap();
        let first = rows.first().unwrap();
        let last = rows.last().unwrap();
        prop_assert_eq!(
            lut.spectral_efficiency(generation, first.threshold_db - margin).unwrap(),
            first.spectral_efficiency
        );
        prop_assert_eq!(
            lut.spectral_efficiency(generation, last.threshold_db + margin).unwrap(),
            last.spectral_efficiency
        );
    }

    #[test]
    fn path_loss_increases_with_distance(
        f in frequency_mhz(),
        h_tx in transmitter_height_m(),
        h_u in user_height_m(),
        var in variation_db(),
        d in distance_km(),
        step in 0.01f64..20.0,
    ) {
        prop_assert!(path_loss_db(f, h_tx, h_u, d, var) < path_loss_db(f, h_tx, h_u, d + step, var));
    }

    #[test]
    fn zero_rate_tco_is_undiscounted((capex, opex, _, years) in tco_inputs()) {
        let tco = total_cost_ownership(capex, opex, 0.0, years);
        let expected = capex + opex * years as f64;
        prop_assert!((tco - expected).abs() <= 1e-9 * expected.max(1.0));
    }

    #[test]
    fn discounting_never_increases_tco((capex, opex, rate, years) in tco_inputs()) {
        let discounted = total_cost_ownership(capex, opex, rate, years);
        let flat = total_cost_ownership(capex, opex, 0.0, years);
        prop_assert!(discounted <= flat + 1e-6);
        prop_assert!(discounted >= capex + opex - 1e-6);
    }

    #[test]
    fn variation_reproducible_and_prefix_stable(
        params in variation_params(),
        mode in seed_mode(),
        f in prop_oneof![Just(600.0), Just(700.0), Just(1800.0), Just(3500.0)],
        extra in 1usize..50,
    ) {
        let mut unused = StdRng::seed_from_u64(0);
        let first = random_variation(f, &params, mode, &mut unused).unwrap();
        let second = random_variation(f, &params, mode, &mut unused).unwrap();
        prop_assert_eq!(&first, &second);

        let longer = VariationParams { draws: params.draws + extra, ..params };
        let extended = random_variation(f, &longer, mode, &mut unused).unwrap();
        prop_assert_eq!(extended.len(), params.draws + extra);
        prop_assert_eq!(&extended[..params.draws], &first[..]);
    }

    #[test]
    fn emission_total_is_sum_of_phases(record in scenario_record(), ctx in emission_context()) {
        let b = emissions::evaluate(&record.emission, &ctx).unwrap();
        let phases = b.total_mfg_ghg_kg
            + b.total_trans_ghg_kg
            + b.total_construction_ghg_kg
            + b.total_operations_ghg_kg
            + b.total_eolt_ghg_kg;
        prop_assert!((b.total_emissions_ghg_kg - phases).abs() <= 1e-9 * phases.abs().max(1.0));
    }

    #[test]
    fn link_budget_finite_for_sampled_records(record in scenario_record()) {
        let lut = SpectralEfficiencyTable::mimo();
        let variation = vec![1.0; record.key.iteration + 1];
        let budget = capacity::evaluate(&record, &lut, &variation).unwrap();
        prop_assert!(budget.path_loss_db.is_finite());
        prop_assert!(budget.capacity_mbps >= 0.0);
        prop_assert_eq!(
            budget.capacity_mbps,
            budget.channel_capacity_mbps * record.radio.antenna_sectors as f64
        );
    }
}

#[test]
fn end_to_end_decile_5_reference() {
    let config = SimulationConfig {
        iterations: 1,
        demand_levels_gb: vec![30.0],
        deciles: vec![Decile::new(5).unwrap()],
        ..SimulationConfig::default()
    };
    let mut record = expand(&config, &mut StdRng::seed_from_u64(1))
        .unwrap()
        .into_iter()
        .find(|r| r.key.generation == Generation::FourG && r.key.frequency_mhz == 700.0)
        .unwrap();
    assert_eq!(record.key.channel_bandwidth_mhz, 20.0);

    record.radio.distance_km = Some(10.0);
    record.radio.transmitter_height_m = 40.0;
    record.radio.user_antenna_height_m = 5.0;
    record.radio.transmitter_power_dbm = 43.0;
    record.radio.transmitter_gain_dbi = 16.0;
    record.radio.user_antenna_gain_dbi = 0.0;
    record.radio.user_antenna_loss_db = 0.0;
    record.radio.interference_db = 0.0;
    record.radio.shadow_fading_db = 0.0;
    record.radio.building_penetration_loss_db = 12.0;
    record.radio.antenna_sectors = 1;

    let budget = capacity::evaluate(&record, &SpectralEfficiencyTable::mimo(), &[0.0]).unwrap();
    assert!((budget.path_loss_db - 147.734115).abs() < 1e-4);
    assert!((budget.received_power_dbm - -100.734115).abs() < 1e-4);
    // CNR of -1.33 dB falls in the CQI 3 bracket
    assert_eq!(budget.spectral_efficiency_bpshz, 0.377);
    assert!((budget.capacity_mbps - 0.377 * 20.0).abs() < 1e-9);
}

#[test]
fn harness_results_independent_of_worker_count() {
    let config = SimulationConfig {
        iterations: 4,
        demand_levels_gb: vec![10.0, 30.0],
        deciles: vec![Decile::new(1).unwrap(), Decile::new(10).unwrap()],
        ..SimulationConfig::default()
    };
    let records = expand(&config, &mut StdRng::seed_from_u64(3)).unwrap();
    let variations =
        prepare_variations(&records, config.seed_mode, &mut StdRng::seed_from_u64(3)).unwrap();

    let rows = |workers: usize| {
        let harness = Harness::new(
            HarnessConfig::new().workers(workers),
            SpectralEfficiencyTable::mimo(),
        )
        .unwrap();
        let outcome = harness.run_capacity(&records, &variations, None).unwrap();
        let mut rows: Vec<String> = outcome
            .rows
            .iter()
            .map(|r| serde_json::to_string(r).unwrap())
            .collect();
        rows.sort();
        rows
    };

    let single = rows(1);
    assert_eq!(single.len(), records.len());
    assert_eq!(single, rows(8));
}
