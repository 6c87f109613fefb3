//! Scenario records and Cartesian expansion
//!
//! A record is one trial: its key (decile, generation, frequency, load level,
//! iteration), the random-variation parameters, and one concrete draw of every
//! bounded radio, cost and emission field. Records are immutable once built.

use crate::config::{
    CarbonFactors, EmissionRanges, InterferenceMode, ResampleGranularity, SimulationConfig,
    TechnologyParams,
};
use crate::sampler::VariationParams;
use crate::{Decile, Generation, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Point on the planning grid, km
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GridPoint {
    pub x_km: f64,
    pub y_km: f64,
}

impl GridPoint {
    pub fn new(x_km: f64, y_km: f64) -> Self {
        Self { x_km, y_km }
    }

    fn draw<R: Rng + ?Sized>(rng: &mut R, side_km: f64) -> Self {
        Self {
            x_km: rng.gen_range(0.0..=side_km),
            y_km: rng.gen_range(0.0..=side_km),
        }
    }
}

/// Identity of a record within the expansion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioKey {
    pub decile: Decile,
    pub generation: Generation,
    pub frequency_mhz: f64,
    pub channel_bandwidth_mhz: f64,
    /// Mean monthly demand per user, GB
    pub demand_gb_month: f64,
    pub iteration: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadioParams {
    pub transmitter: GridPoint,
    pub receiver: GridPoint,
    /// Overrides the transmitter-receiver distance when set
    pub distance_km: Option<f64>,
    pub transmitter_height_m: f64,
    pub user_antenna_height_m: f64,
    pub transmitter_power_dbm: f64,
    pub transmitter_gain_dbi: f64,
    pub user_antenna_gain_dbi: f64,
    pub user_antenna_loss_db: f64,
    pub interference_db: f64,
    pub shadow_fading_db: f64,
    pub building_penetration_loss_db: f64,
    pub antenna_sectors: u32,
    pub system_temperature_k: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostParams {
    pub sector_antenna_usd: f64,
    pub remote_radio_unit_usd: f64,
    pub io_fronthaul_usd: f64,
    pub control_unit_usd: f64,
    pub cooling_fans_usd: f64,
    pub battery_power_usd: f64,
    pub bbu_cabinet_usd: f64,
    pub tower_usd: f64,
    pub civil_materials_usd: f64,
    pub router_usd: f64,
    pub transportation_usd: f64,
    pub installation_usd: f64,
    pub site_rental_usd: f64,
    pub base_station_energy_usd: f64,
    pub staff_costs_usd: f64,
    pub fiber_link_usd: f64,
    pub spectrum_usd_per_mhz_pop: f64,
    pub discount_rate_pct: f64,
    pub assessment_years: u32,
}

/// Per-site material masses, kg
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialMasses {
    pub bbu_rru_pcb_kg: f64,
    pub bbu_rru_aluminium_kg: f64,
    pub copper_antenna_kg: f64,
    pub aluminium_antenna_kg: f64,
    pub pvc_antenna_kg: f64,
    pub iron_antenna_kg: f64,
    pub steel_antenna_kg: f64,
    pub steel_tower_kg: f64,
    pub aluminium_frame_kg: f64,
    pub steel_pole_kg: f64,
    pub machine_concrete_kg: f64,
    pub machine_steel_kg: f64,
    pub basic_aluminium_device_kg: f64,
}

/// Per-user device masses, kg
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceMasses {
    pub smartphone_kg: f64,
    pub ict_equipment_kg: f64,
    pub power_supply_kg: f64,
    pub lithium_battery_kg: f64,
}

impl DeviceMasses {
    pub fn total_kg(&self) -> f64 {
        self.smartphone_kg + self.ict_equipment_kg + self.power_supply_kg + self.lithium_battery_kg
    }
}

/// Annual energy use, kWh
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyUse {
    pub smartphone_kwh: f64,
    pub ict_kwh: f64,
    pub base_band_unit_kwh: f64,
    pub radio_frequency_kwh: f64,
    pub epc_center_kwh: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmissionParams {
    pub materials: MaterialMasses,
    /// Present when device manufacturing is counted
    pub devices: Option<DeviceMasses>,
    pub consumption_lt_per_km: f64,
    pub machine_fuel_eff_lt_per_hr: f64,
    pub machine_operation_hrs: f64,
    pub energy: EnergyUse,
    pub factors: CarbonFactors,
    pub social_carbon_cost_usd: f64,
}

/// One engineering, cost and emission trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRecord {
    pub key: ScenarioKey,
    pub variation: VariationParams,
    pub radio: RadioParams,
    pub cost: CostParams,
    pub emission: EmissionParams,
}

/// Bounded fields drawn together for one expansion tuple
#[derive(Debug, Clone, Copy)]
struct BoundedDraw {
    radio: RadioParams,
    cost: CostParams,
    emission: EmissionParams,
}

impl BoundedDraw {
    fn draw<R: Rng + ?Sized>(
        params: &TechnologyParams,
        interference: InterferenceMode,
        rng: &mut R,
    ) -> Self {
        let interference_db = match interference {
            InterferenceMode::None => 0.0,
            InterferenceMode::Sampled => params.interference_db.sample(rng),
        };
        let radio = RadioParams {
            transmitter: GridPoint::default(),
            receiver: GridPoint::default(),
            distance_km: None,
            transmitter_height_m: params.transmitter_height_m.sample(rng),
            user_antenna_height_m: params.user_antenna_height_m.sample(rng),
            transmitter_power_dbm: params.transmitter_power_dbm.sample(rng),
            transmitter_gain_dbi: params.transmitter_gain_dbi.sample(rng),
            user_antenna_gain_dbi: params.user_antenna_gain_dbi.sample(rng),
            user_antenna_loss_db: params.user_antenna_loss_db.sample(rng),
            interference_db,
            shadow_fading_db: params.shadow_fading_db,
            building_penetration_loss_db: params.building_penetration_loss_db,
            antenna_sectors: params.antenna_sectors,
            system_temperature_k: params.system_temperature_k,
        };

        let c = &params.costs;
        let cost = CostParams {
            sector_antenna_usd: c.sector_antenna_usd.sample(rng),
            remote_radio_unit_usd: c.remote_radio_unit_usd.sample(rng),
            io_fronthaul_usd: c.io_fronthaul_usd.sample(rng),
            control_unit_usd: c.control_unit_usd.sample(rng),
            cooling_fans_usd: c.cooling_fans_usd.sample(rng),
            battery_power_usd: c.battery_power_usd.sample(rng),
            bbu_cabinet_usd: c.bbu_cabinet_usd.sample(rng),
            tower_usd: c.tower_usd.sample(rng),
            civil_materials_usd: c.civil_materials_usd.sample(rng),
            router_usd: c.router_usd.sample(rng),
            transportation_usd: c.transportation_usd.sample(rng),
            installation_usd: c.installation_usd.sample(rng),
            site_rental_usd: c.site_rental_usd.sample(rng),
            base_station_energy_usd: c.base_station_energy_usd.sample(rng),
            staff_costs_usd: c.staff_costs_usd.sample(rng),
            fiber_link_usd: c.fiber_link_usd.sample(rng),
            spectrum_usd_per_mhz_pop: c.spectrum_usd_per_mhz_pop.sample(rng),
            discount_rate_pct: c.discount_rate_pct,
            assessment_years: c.assessment_years,
        };

        Self {
            radio,
            cost,
            emission: draw_emission(&params.emissions, rng),
        }
    }
}

fn draw_emission<R: Rng + ?Sized>(e: &EmissionRanges, rng: &mut R) -> EmissionParams {
    let m = &e.materials;
    let materials = MaterialMasses {
        bbu_rru_pcb_kg: m.bbu_rru_pcb_kg.sample(rng),
        bbu_rru_aluminium_kg: m.bbu_rru_aluminium_kg.sample(rng),
        copper_antenna_kg: m.copper_antenna_kg.sample(rng),
        aluminium_antenna_kg: m.aluminium_antenna_kg.sample(rng),
        pvc_antenna_kg: m.pvc_antenna_kg.sample(rng),
        iron_antenna_kg: m.iron_antenna_kg.sample(rng),
        steel_antenna_kg: m.steel_antenna_kg.sample(rng),
        steel_tower_kg: m.steel_tower_kg.sample(rng),
        aluminium_frame_kg: m.aluminium_frame_kg.sample(rng),
        steel_pole_kg: m.steel_pole_kg.sample(rng),
        machine_concrete_kg: m.machine_concrete_kg.sample(rng),
        machine_steel_kg: m.machine_steel_kg.sample(rng),
        basic_aluminium_device_kg: m.basic_aluminium_device_kg.sample(rng),
    };

    // Drawn regardless of `include_devices` so toggling it leaves the rest of
    // the stream unchanged.
    let devices = DeviceMasses {
        smartphone_kg: e.smartphone_kg.sample(rng),
        ict_equipment_kg: e.ict_equipment_kg.sample(rng),
        power_supply_kg: e.power_supply_kg.sample(rng),
        lithium_battery_kg: e.lithium_battery_kg.sample(rng),
    };

    EmissionParams {
        materials,
        devices: e.include_devices.then_some(devices),
        consumption_lt_per_km: e.consumption_lt_per_km.sample(rng),
        machine_fuel_eff_lt_per_hr: e.machine_fuel_eff_lt_per_hr.sample(rng),
        machine_operation_hrs: e.machine_operation_hrs.sample(rng),
        energy: EnergyUse {
            smartphone_kwh: e.smartphone_kwh.sample(rng),
            ict_kwh: e.ict_kwh.sample(rng),
            base_band_unit_kwh: e.base_band_unit_kwh.sample(rng),
            radio_frequency_kwh: e.radio_frequency_kwh.sample(rng),
            epc_center_kwh: e.epc_center_kwh.sample(rng),
        },
        factors: e.factors,
        social_carbon_cost_usd: e.social_carbon_cost_usd,
    }
}

/// Link geometry, drawn for every record
fn draw_geometry<R: Rng + ?Sized>(
    params: &TechnologyParams,
    radio: &mut RadioParams,
    rng: &mut R,
) {
    radio.transmitter = GridPoint::draw(rng, params.grid_length_km);
    radio.receiver = GridPoint::draw(rng, params.grid_length_km + 5.0);
    radio.distance_km = params.distance_km.map(|range| range.sample(rng));
}

/// Expand generations x frequencies x load levels x iterations x deciles
/// into scenario records.
///
/// Bounded fields are drawn from `rng` according to `config.resample`; link
/// geometry is drawn per record. The same generator state and configuration
/// always produce the same records.
pub fn expand<R: Rng + ?Sized>(
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<Vec<ScenarioRecord>> {
    config.validate()?;

    let mut records = Vec::with_capacity(config.record_count());
    for (generation, params) in &config.technologies {
        for &frequency_mhz in &params.frequencies_mhz {
            for &demand_gb_month in &config.demand_levels_gb {
                let shared = BoundedDraw::draw(params, config.interference, rng);
                debug!(
                    "Drew bounded fields for {} {} MHz at {} GB/month",
                    generation, frequency_mhz, demand_gb_month
                );

                for iteration in 0..config.iterations {
                    for &decile in &config.deciles {
                        let mut draw = match config.resample {
                            ResampleGranularity::PerFrequencyLoad => shared,
                            ResampleGranularity::PerRecord => {
                                BoundedDraw::draw(params, config.interference, rng)
                            }
                        };
                        draw_geometry(params, &mut draw.radio, rng);

                        records.push(ScenarioRecord {
                            key: ScenarioKey {
                                decile,
                                generation: *generation,
                                frequency_mhz,
                                channel_bandwidth_mhz: params.channel_bandwidth_mhz,
                                demand_gb_month,
                                iteration,
                            },
                            variation: config.variation,
                            radio: draw.radio,
                            cost: draw.cost,
                            emission: draw.emission,
                        });
                    }
                }
            }
        }
    }

    info!(
        "Expanded {} scenario records ({:?} resampling)",
        records.len(),
        config.resample
    );
    Ok(records)
}
