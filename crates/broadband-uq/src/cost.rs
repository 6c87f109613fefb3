//! Total cost of ownership
//!
//! Closed-form per-site capex/opex and a discounted opex stream over the
//! assessment period, scaled by the number of sites a decile needs.

use crate::scenario::CostParams;
use crate::{Result, UqError};
use serde::{Deserialize, Serialize};

/// Share of upgradeable capital items spent each year on upgrades
pub const ANNUAL_UPGRADE_SHARE: f64 = 0.1;

/// Sum of the ten equipment unit costs
pub fn equipment_cost(cost: &CostParams) -> f64 {
    cost.sector_antenna_usd
        + cost.remote_radio_unit_usd
        + cost.io_fronthaul_usd
        + cost.control_unit_usd
        + cost.cooling_fans_usd
        + cost.battery_power_usd
        + cost.bbu_cabinet_usd
        + cost.tower_usd
        + cost.civil_materials_usd
        + cost.router_usd
}

pub fn spectrum_cost(frequency_mhz: f64, population: f64, usd_per_mhz_pop: f64) -> f64 {
    frequency_mhz * population * usd_per_mhz_pop
}

pub fn capex(equipment: f64, spectrum: f64, installation: f64, transportation: f64) -> f64 {
    equipment + spectrum + installation + transportation
}

/// Site rental, energy and staff plus 10% of antenna, radio unit, baseband,
/// router and fibre link for upgrades
pub fn annual_opex(cost: &CostParams) -> f64 {
    let upgradeable = cost.sector_antenna_usd
        + cost.remote_radio_unit_usd
        + cost.bbu_cabinet_usd
        + cost.router_usd
        + cost.fiber_link_usd;
    cost.site_rental_usd
        + cost.base_station_energy_usd
        + cost.staff_costs_usd
        + ANNUAL_UPGRADE_SHARE * upgradeable
}

/// `capex + opex + sum(opex / (1 + r)^t, t = 1..T-1)`.
///
/// The first year's opex is not discounted.
pub fn total_cost_ownership(
    capex: f64,
    annual_opex: f64,
    discount_rate_pct: f64,
    assessment_years: u32,
) -> f64 {
    let factor = 1.0 + discount_rate_pct / 100.0;
    let discounted: f64 = (1..assessment_years)
        .map(|t| annual_opex / factor.powi(t as i32))
        .sum();
    capex + annual_opex + discounted
}

/// Cost subtotals for one record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub equipment_cost_usd: f64,
    pub spectrum_cost_usd: f64,
    pub capex_cost_usd: f64,
    pub opex_cost_usd: f64,
    /// Per-site TCO
    pub total_base_station_tco_usd: f64,
    /// Per-site TCO x required sites
    pub total_decile_tco_usd: f64,
}

/// Cost of one record for a decile population and site count
pub fn evaluate(
    cost: &CostParams,
    frequency_mhz: f64,
    population: f64,
    sites: u64,
) -> Result<CostBreakdown> {
    if !population.is_finite() || population < 0.0 {
        return Err(UqError::InvalidRecord(format!(
            "population {} is not a usable count",
            population
        )));
    }

    let equipment = equipment_cost(cost);
    let spectrum = spectrum_cost(frequency_mhz, population, cost.spectrum_usd_per_mhz_pop);
    let capex = capex(
        equipment,
        spectrum,
        cost.installation_usd,
        cost.transportation_usd,
    );
    let opex = annual_opex(cost);
    let tco = total_cost_ownership(capex, opex, cost.discount_rate_pct, cost.assessment_years);
    if !tco.is_finite() {
        return Err(UqError::NonFinite {
            quantity: "total_base_station_tco_usd",
            value: tco,
        });
    }

    Ok(CostBreakdown {
        equipment_cost_usd: equipment,
        spectrum_cost_usd: spectrum,
        capex_cost_usd: capex,
        opex_cost_usd: opex,
        total_base_station_tco_usd: tco,
        total_decile_tco_usd: tco * sites as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_costs() -> CostParams {
        CostParams {
            sector_antenna_usd: 1500.0,
            remote_radio_unit_usd: 3500.0,
            io_fronthaul_usd: 1500.0,
            control_unit_usd: 2000.0,
            cooling_fans_usd: 250.0,
            battery_power_usd: 10000.0,
            bbu_cabinet_usd: 200.0,
            tower_usd: 5000.0,
            civil_materials_usd: 5000.0,
            router_usd: 2000.0,
            transportation_usd: 1300.0,
            installation_usd: 5000.0,
            site_rental_usd: 1000.0,
            base_station_energy_usd: 250.0,
            staff_costs_usd: 40000.0,
            fiber_link_usd: 10000.0,
            spectrum_usd_per_mhz_pop: 0.001,
            discount_rate_pct: 7.0,
            assessment_years: 10,
        }
    }

    #[test]
    fn test_degenerate_discount() {
        assert_eq!(total_cost_ownership(0.0, 100.0, 0.0, 5), 500.0);
        assert_eq!(total_cost_ownership(250.0, 100.0, 0.0, 1), 350.0);
        assert_eq!(total_cost_ownership(250.0, 100.0, 5.0, 0), 350.0);
    }

    #[test]
    fn test_first_year_undiscounted() {
        // capex 1000, opex 100 at 10% over 3 years: 1000 + 100 + 100/1.1 + 100/1.21
        let tco = total_cost_ownership(1000.0, 100.0, 10.0, 3);
        let expected = 1000.0 + 100.0 + 100.0 / 1.1 + 100.0 / 1.21;
        assert!((tco - expected).abs() < 1e-9);
    }

    #[test]
    fn test_components() {
        let costs = unit_costs();
        assert_eq!(equipment_cost(&costs), 30950.0);
        // 1000 + 250 + 40000 + 0.1 * (1500 + 3500 + 200 + 2000 + 10000)
        assert!((annual_opex(&costs) - 42970.0).abs() < 1e-9);
        assert!((spectrum_cost(700.0, 20000.0, 0.001) - 14000.0).abs() < 1e-9);
    }

    #[test]
    fn test_evaluate_scales_by_sites() {
        let breakdown = evaluate(&unit_costs(), 700.0, 20000.0, 4).unwrap();
        assert!((breakdown.capex_cost_usd - (30950.0 + 14000.0 + 5000.0 + 1300.0)).abs() < 1e-9);
        assert!(
            (breakdown.total_decile_tco_usd - 4.0 * breakdown.total_base_station_tco_usd).abs()
                < 1e-6
        );
        assert_eq!(evaluate(&unit_costs(), 700.0, 20000.0, 0).unwrap().total_decile_tco_usd, 0.0);
    }

    #[test]
    fn test_bad_population_excluded() {
        let err = evaluate(&unit_costs(), 700.0, f64::NAN, 1).unwrap_err();
        assert!(!err.is_fatal());
    }
}
