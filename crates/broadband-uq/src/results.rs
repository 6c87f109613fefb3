//! Flat result rows, one per scenario record, as written to the stage tables

use crate::aggregates::DecileAggregate;
use crate::capacity::LinkBudget;
use crate::cost::CostBreakdown;
use crate::emissions::EmissionBreakdown;
use crate::scenario::ScenarioRecord;
use crate::{Decile, Generation};
use serde::{Deserialize, Serialize};

/// Link budget of one record, left-joined with its decile aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityRow {
    pub decile: Decile,
    pub cell_generation: Generation,
    pub frequency_mhz: f64,
    pub channel_bandwidth_mhz: f64,
    pub mean_monthly_demand_gb: f64,
    pub iteration: usize,
    pub transmitter_x: f64,
    pub transmitter_y: f64,
    pub receiver_x: f64,
    pub receiver_y: f64,
    pub intersite_distance_km: f64,
    pub random_variation_db: f64,
    pub hk_rural_correction_db: f64,
    pub hk_city_correction_db: f64,
    pub path_loss_db: f64,
    pub received_power_dbm: f64,
    pub noise_dbm: f64,
    pub interference_db: f64,
    pub sinr_db: f64,
    pub spectral_efficiency_bpshz: f64,
    pub channel_capacity_mbps: f64,
    pub capacity_mbps: f64,
    pub site_area_sqkm: f64,
    pub capacity_mbps_km2: f64,
    pub total_population: Option<f64>,
    pub mean_poor_connected: Option<f64>,
    pub mean_area_sqkm: Option<f64>,
    pub total_area_sqkm: Option<f64>,
}

impl CapacityRow {
    pub fn new(
        record: &ScenarioRecord,
        budget: &LinkBudget,
        aggregate: Option<&DecileAggregate>,
    ) -> Self {
        let key = &record.key;
        let radio = &record.radio;
        Self {
            decile: key.decile,
            cell_generation: key.generation,
            frequency_mhz: key.frequency_mhz,
            channel_bandwidth_mhz: key.channel_bandwidth_mhz,
            mean_monthly_demand_gb: key.demand_gb_month,
            iteration: key.iteration,
            transmitter_x: radio.transmitter.x_km,
            transmitter_y: radio.transmitter.y_km,
            receiver_x: radio.receiver.x_km,
            receiver_y: radio.receiver.y_km,
            intersite_distance_km: budget.intersite_distance_km,
            random_variation_db: budget.random_variation_db,
            hk_rural_correction_db: budget.rural_correction_db,
            hk_city_correction_db: budget.city_correction_db,
            path_loss_db: budget.path_loss_db,
            received_power_dbm: budget.received_power_dbm,
            noise_dbm: budget.noise_dbm,
            interference_db: budget.interference_db,
            sinr_db: budget.cnr_db,
            spectral_efficiency_bpshz: budget.spectral_efficiency_bpshz,
            channel_capacity_mbps: budget.channel_capacity_mbps,
            capacity_mbps: budget.capacity_mbps,
            site_area_sqkm: budget.site_area_sqkm,
            capacity_mbps_km2: budget.capacity_mbps_km2,
            total_population: aggregate.map(|a| a.total_population),
            mean_poor_connected: aggregate.map(|a| a.mean_poor_connected),
            mean_area_sqkm: aggregate.map(|a| a.mean_area_sqkm),
            total_area_sqkm: aggregate.map(|a| a.total_area_sqkm),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRow {
    pub decile: Decile,
    pub cell_generation: Generation,
    pub frequency_mhz: f64,
    pub channel_bandwidth_mhz: f64,
    pub mean_monthly_demand_gb: f64,
    pub iteration: usize,
    pub equipment_cost_usd: f64,
    pub spectrum_cost_usd: f64,
    pub capex_cost_usd: f64,
    pub opex_cost_usd: f64,
    pub total_base_station_tco_usd: f64,
    pub total_decile_tco_usd: f64,
    pub number_of_sites: u64,
    pub assessment_years: u32,
    pub discount_rate_pct: f64,
    pub total_poor_unconnected: f64,
    pub mean_poor_connected: f64,
    pub mean_area_sqkm: f64,
    pub total_area_sqkm: f64,
    #[serde(rename = "cost_per_1GB_usd")]
    pub cost_per_1gb_usd: Option<f64>,
    pub monthly_income_usd: Option<f64>,
    pub cost_per_month_usd: Option<f64>,
    pub arpu_usd: Option<f64>,
    pub adoption_rate: Option<f64>,
}

impl CostRow {
    pub fn new(
        record: &ScenarioRecord,
        breakdown: &CostBreakdown,
        aggregate: &DecileAggregate,
        sites: u64,
    ) -> Self {
        let key = &record.key;
        Self {
            decile: key.decile,
            cell_generation: key.generation,
            frequency_mhz: key.frequency_mhz,
            channel_bandwidth_mhz: key.channel_bandwidth_mhz,
            mean_monthly_demand_gb: key.demand_gb_month,
            iteration: key.iteration,
            equipment_cost_usd: breakdown.equipment_cost_usd,
            spectrum_cost_usd: breakdown.spectrum_cost_usd,
            capex_cost_usd: breakdown.capex_cost_usd,
            opex_cost_usd: breakdown.opex_cost_usd,
            total_base_station_tco_usd: breakdown.total_base_station_tco_usd,
            total_decile_tco_usd: breakdown.total_decile_tco_usd,
            number_of_sites: sites,
            assessment_years: record.cost.assessment_years,
            discount_rate_pct: record.cost.discount_rate_pct,
            total_poor_unconnected: aggregate.total_poor_unconnected,
            mean_poor_connected: aggregate.mean_poor_connected,
            mean_area_sqkm: aggregate.mean_area_sqkm,
            total_area_sqkm: aggregate.total_area_sqkm,
            cost_per_1gb_usd: aggregate.cost_per_1gb_usd,
            monthly_income_usd: aggregate.monthly_income_usd,
            cost_per_month_usd: aggregate.cost_per_month_usd,
            arpu_usd: aggregate.arpu_usd,
            adoption_rate: aggregate.adoption_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionRow {
    pub decile: Decile,
    pub cell_generation: Generation,
    pub frequency_mhz: f64,
    pub mean_monthly_demand_gb: f64,
    pub iteration: usize,
    pub aluminium_mfg_ghg_kg: f64,
    pub steel_iron_mfg_ghg_kg: f64,
    pub concrete_mfg_ghg_kg: f64,
    pub plastics_mfg_ghg_kg: f64,
    pub other_metals_mfg_ghg_kg: f64,
    pub devices_mfg_ghg_kg: f64,
    pub aluminium_eolt_ghg_kg: f64,
    pub steel_iron_eolt_ghg_kg: f64,
    pub plastics_eolt_ghg_kg: f64,
    pub other_metals_eolt_ghg_kg: f64,
    pub total_mfg_ghg_kg: f64,
    pub total_trans_ghg_kg: f64,
    pub total_construction_ghg_kg: f64,
    pub total_operations_ghg_kg: f64,
    pub total_eolt_ghg_kg: f64,
    pub total_emissions_ghg_kg: f64,
    pub social_carbon_cost_usd: f64,
    pub total_population: f64,
    pub total_poor_unconnected: f64,
    pub mean_poor_connected: f64,
    pub no_of_required_sites: u64,
}

impl EmissionRow {
    pub fn new(
        record: &ScenarioRecord,
        breakdown: &EmissionBreakdown,
        aggregate: &DecileAggregate,
        sites: u64,
    ) -> Self {
        let key = &record.key;
        let mfg = &breakdown.manufacturing;
        let eol = &breakdown.end_of_life;
        Self {
            decile: key.decile,
            cell_generation: key.generation,
            frequency_mhz: key.frequency_mhz,
            mean_monthly_demand_gb: key.demand_gb_month,
            iteration: key.iteration,
            aluminium_mfg_ghg_kg: mfg.aluminium_kg,
            steel_iron_mfg_ghg_kg: mfg.steel_iron_kg,
            concrete_mfg_ghg_kg: mfg.concrete_kg,
            plastics_mfg_ghg_kg: mfg.plastics_kg,
            other_metals_mfg_ghg_kg: mfg.other_metals_kg,
            devices_mfg_ghg_kg: mfg.devices_kg,
            aluminium_eolt_ghg_kg: eol.aluminium_kg,
            steel_iron_eolt_ghg_kg: eol.steel_iron_kg,
            plastics_eolt_ghg_kg: eol.plastics_kg,
            other_metals_eolt_ghg_kg: eol.other_metals_kg,
            total_mfg_ghg_kg: breakdown.total_mfg_ghg_kg,
            total_trans_ghg_kg: breakdown.total_trans_ghg_kg,
            total_construction_ghg_kg: breakdown.total_construction_ghg_kg,
            total_operations_ghg_kg: breakdown.total_operations_ghg_kg,
            total_eolt_ghg_kg: breakdown.total_eolt_ghg_kg,
            total_emissions_ghg_kg: breakdown.total_emissions_ghg_kg,
            social_carbon_cost_usd: breakdown.social_carbon_cost_usd,
            total_population: aggregate.total_population,
            total_poor_unconnected: aggregate.total_poor_unconnected,
            mean_poor_connected: aggregate.mean_poor_connected,
            no_of_required_sites: sites,
        }
    }
}
