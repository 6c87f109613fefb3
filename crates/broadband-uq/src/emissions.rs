//! Lifecycle emissions
//!
//! Five phases per site (manufacturing, transportation, construction,
//! operations, end-of-life). Each phase total is multiplied by the number of
//! sites the decile needs for the record's generation; material breakdowns
//! are reported per site.

use crate::config::CarbonFactors;
use crate::scenario::{DeviceMasses, EmissionParams, EnergyUse, MaterialMasses};
use crate::{Result, UqError};
use serde::{Deserialize, Serialize};

/// Users served by one core-network node
pub const USERS_PER_CORE_NODE: f64 = 150_280.0;

/// Emissions by material class, kg CO2e
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MaterialBreakdown {
    pub aluminium_kg: f64,
    pub steel_iron_kg: f64,
    pub concrete_kg: f64,
    pub plastics_kg: f64,
    pub other_metals_kg: f64,
    /// User devices, zero unless device manufacturing is counted
    pub devices_kg: f64,
}

impl MaterialBreakdown {
    pub fn total(&self) -> f64 {
        self.aluminium_kg
            + self.steel_iron_kg
            + self.concrete_kg
            + self.plastics_kg
            + self.other_metals_kg
            + self.devices_kg
    }
}

fn aluminium_mass(m: &MaterialMasses) -> f64 {
    m.bbu_rru_aluminium_kg + m.aluminium_antenna_kg + m.aluminium_frame_kg + m.basic_aluminium_device_kg
}

fn steel_iron_mass(m: &MaterialMasses) -> (f64, f64) {
    let steel = m.steel_antenna_kg + m.steel_tower_kg + m.steel_pole_kg + m.machine_steel_kg;
    (m.iron_antenna_kg, steel)
}

/// Manufacturing emissions per site.
///
/// `devices` adds `device mass x device factor x users` as its own class.
pub fn manufacturing(
    masses: &MaterialMasses,
    devices: Option<(&DeviceMasses, f64)>,
    factors: &CarbonFactors,
) -> MaterialBreakdown {
    let (iron, steel) = steel_iron_mass(masses);
    MaterialBreakdown {
        aluminium_kg: aluminium_mass(masses) * factors.aluminium_kg_co2e,
        steel_iron_kg: iron * factors.iron_kg_co2e + steel * factors.steel_kg_co2e,
        concrete_kg: masses.machine_concrete_kg * factors.concrete_kg_co2e,
        plastics_kg: masses.bbu_rru_pcb_kg * factors.pcb_kg_co2e
            + masses.pvc_antenna_kg * factors.pvc_kg_co2e,
        other_metals_kg: masses.copper_antenna_kg * factors.copper_kg_co2e,
        devices_kg: devices
            .map(|(d, users)| d.total_kg() * factors.device_kg_co2e * users)
            .unwrap_or(0.0),
    }
}

/// Road haulage plus optional sea freight, kg CO2e
pub fn transportation(
    distance_km: f64,
    consumption_lt_per_km: f64,
    diesel_factor_kgco2e: f64,
    maritime: Option<(f64, f64)>,
) -> f64 {
    let road = distance_km * consumption_lt_per_km * diesel_factor_kgco2e;
    let sea = maritime
        .map(|(maritime_km, container_ship_kgco2e)| maritime_km * container_ship_kgco2e)
        .unwrap_or(0.0);
    road + sea
}

/// Site construction machinery, kg CO2e
pub fn construction(
    machine_fuel_eff_lt_per_hr: f64,
    machine_operation_hrs: f64,
    diesel_factor_kgco2e: f64,
) -> f64 {
    machine_fuel_eff_lt_per_hr * machine_operation_hrs * diesel_factor_kgco2e
}

/// Notional core-network nodes for a user count
pub fn core_nodes(users: f64) -> f64 {
    users / USERS_PER_CORE_NODE
}

/// Annual operating emissions of one site and its users, kg CO2e
pub fn operations(energy: &EnergyUse, users: f64, electricity_kg_co2e: f64) -> f64 {
    let devices = (energy.smartphone_kwh + energy.ict_kwh) * users;
    let base_station = energy.base_band_unit_kwh + energy.radio_frequency_kwh;
    let core = energy.epc_center_kwh * core_nodes(users);
    (devices + base_station + core) * electricity_kg_co2e
}

/// End-of-life treatment per site. Concrete is not treated.
pub fn end_of_life(masses: &MaterialMasses, factors: &CarbonFactors) -> MaterialBreakdown {
    let (iron, steel) = steel_iron_mass(masses);
    MaterialBreakdown {
        aluminium_kg: aluminium_mass(masses) * factors.metals_factor_kgco2e,
        steel_iron_kg: (iron + steel) * factors.metals_factor_kgco2e,
        concrete_kg: 0.0,
        plastics_kg: (masses.bbu_rru_pcb_kg + masses.pvc_antenna_kg) * factors.plastics_factor_kgco2e,
        other_metals_kg: masses.copper_antenna_kg * factors.metals_factor_kgco2e,
        devices_kg: 0.0,
    }
}

/// Social cost of carbon for a total in kg, at USD per tonne
pub fn social_carbon_cost_usd(total_kg: f64, usd_per_tonne: f64) -> f64 {
    total_kg / 1000.0 * usd_per_tonne
}

/// Decile-level inputs the emission phases need
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionContext {
    /// Users served per site
    pub users: f64,
    /// Road haulage distance, km
    pub distance_km: f64,
    pub maritime_km: Option<f64>,
    pub sites: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmissionBreakdown {
    /// Per site
    pub manufacturing: MaterialBreakdown,
    /// Per site
    pub end_of_life: MaterialBreakdown,
    pub total_mfg_ghg_kg: f64,
    pub total_trans_ghg_kg: f64,
    pub total_construction_ghg_kg: f64,
    pub total_operations_ghg_kg: f64,
    pub total_eolt_ghg_kg: f64,
    pub total_emissions_ghg_kg: f64,
    pub social_carbon_cost_usd: f64,
}

/// All five phases for one record, scaled by `ctx.sites`
pub fn evaluate(params: &EmissionParams, ctx: &EmissionContext) -> Result<EmissionBreakdown> {
    if !(ctx.users.is_finite() && ctx.users >= 0.0) {
        return Err(UqError::InvalidRecord(format!(
            "user count {} is not usable",
            ctx.users
        )));
    }

    let factors = &params.factors;
    let sites = ctx.sites as f64;

    let mfg = manufacturing(
        &params.materials,
        params.devices.as_ref().map(|d| (d, ctx.users)),
        factors,
    );
    let eol = end_of_life(&params.materials, factors);
    let trans = transportation(
        ctx.distance_km,
        params.consumption_lt_per_km,
        factors.diesel_factor_kgco2e,
        ctx.maritime_km.map(|km| (km, factors.container_ship_kgco2e)),
    );
    let build = construction(
        params.machine_fuel_eff_lt_per_hr,
        params.machine_operation_hrs,
        factors.diesel_factor_kgco2e,
    );
    let ops = operations(&params.energy, ctx.users, factors.electricity_kg_co2e);

    let total_mfg = mfg.total() * sites;
    let total_trans = trans * sites;
    let total_build = build * sites;
    let total_ops = ops * sites;
    let total_eol = eol.total() * sites;
    let total = total_mfg + total_trans + total_build + total_ops + total_eol;

    if !total.is_finite() {
        return Err(UqError::NonFinite {
            quantity: "total_emissions_ghg_kg",
            value: total,
        });
    }

    Ok(EmissionBreakdown {
        manufacturing: mfg,
        end_of_life: eol,
        total_mfg_ghg_kg: total_mfg,
        total_trans_ghg_kg: total_trans,
        total_construction_ghg_kg: total_build,
        total_operations_ghg_kg: total_ops,
        total_eolt_ghg_kg: total_eol,
        total_emissions_ghg_kg: total,
        social_carbon_cost_usd: social_carbon_cost_usd(total, params.social_carbon_cost_usd),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_masses() -> MaterialMasses {
        MaterialMasses {
            bbu_rru_pcb_kg: 1.0,
            bbu_rru_aluminium_kg: 1.0,
            copper_antenna_kg: 1.0,
            aluminium_antenna_kg: 1.0,
            pvc_antenna_kg: 1.0,
            iron_antenna_kg: 1.0,
            steel_antenna_kg: 1.0,
            steel_tower_kg: 1.0,
            aluminium_frame_kg: 1.0,
            steel_pole_kg: 1.0,
            machine_concrete_kg: 1.0,
            machine_steel_kg: 1.0,
            basic_aluminium_device_kg: 1.0,
        }
    }

    fn params() -> EmissionParams {
        EmissionParams {
            materials: unit_masses(),
            devices: None,
            consumption_lt_per_km: 0.2,
            machine_fuel_eff_lt_per_hr: 15.0,
            machine_operation_hrs: 60.0,
            energy: EnergyUse {
                smartphone_kwh: 5.0,
                ict_kwh: 50.0,
                base_band_unit_kwh: 5000.0,
                radio_frequency_kwh: 8000.0,
                epc_center_kwh: 1.2e6,
            },
            factors: CarbonFactors::default(),
            social_carbon_cost_usd: 75.0,
        }
    }

    #[test]
    fn test_material_grouping() {
        let f = CarbonFactors::default();
        let mfg = manufacturing(&unit_masses(), None, &f);
        assert!((mfg.aluminium_kg - 4.0 * f.aluminium_kg_co2e).abs() < 1e-9);
        assert!((mfg.steel_iron_kg - (f.iron_kg_co2e + 4.0 * f.steel_kg_co2e)).abs() < 1e-9);
        assert!((mfg.plastics_kg - (f.pcb_kg_co2e + f.pvc_kg_co2e)).abs() < 1e-9);
        assert_eq!(mfg.devices_kg, 0.0);

        let eol = end_of_life(&unit_masses(), &f);
        assert_eq!(eol.concrete_kg, 0.0);
        assert!((eol.steel_iron_kg - 5.0 * f.metals_factor_kgco2e).abs() < 1e-9);
    }

    #[test]
    fn test_devices_scale_with_users() {
        let f = CarbonFactors::default();
        let devices = DeviceMasses {
            smartphone_kg: 0.2,
            ict_equipment_kg: 4.0,
            power_supply_kg: 1.0,
            lithium_battery_kg: 0.3,
        };
        let mfg = manufacturing(&unit_masses(), Some((&devices, 100.0)), &f);
        assert!((mfg.devices_kg - 5.5 * f.device_kg_co2e * 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_transport_with_and_without_sea() {
        assert!((transportation(100.0, 0.2, 2.5, None) - 50.0).abs() < 1e-9);
        assert!((transportation(100.0, 0.2, 2.5, Some((1000.0, 0.01))) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_operations_core_share() {
        let energy = params().energy;
        let ops = operations(&energy, USERS_PER_CORE_NODE, 1.0);
        let expected = 55.0 * USERS_PER_CORE_NODE + 13000.0 + 1.2e6;
        assert!((ops - expected).abs() < 1e-3);
    }

    #[test]
    fn test_total_is_sum_of_phases() {
        let ctx = EmissionContext {
            users: 2500.0,
            distance_km: 40.0,
            maritime_km: Some(800.0),
            sites: 7,
        };
        let b = evaluate(&params(), &ctx).unwrap();
        let sum = b.total_mfg_ghg_kg
            + b.total_trans_ghg_kg
            + b.total_construction_ghg_kg
            + b.total_operations_ghg_kg
            + b.total_eolt_ghg_kg;
        assert!((b.total_emissions_ghg_kg - sum).abs() <= 1e-9 * sum.abs());
        assert!((b.total_mfg_ghg_kg - 7.0 * b.manufacturing.total()).abs() < 1e-6);
        assert!(
            (b.social_carbon_cost_usd - b.total_emissions_ghg_kg / 1000.0 * 75.0).abs() < 1e-9
        );
    }

    #[test]
    fn test_zero_sites_zero_totals() {
        let ctx = EmissionContext {
            users: 100.0,
            distance_km: 10.0,
            maritime_km: None,
            sites: 0,
        };
        let b = evaluate(&params(), &ctx).unwrap();
        assert_eq!(b.total_emissions_ghg_kg, 0.0);
        assert!(b.manufacturing.total() > 0.0);
    }
}
