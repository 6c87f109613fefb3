//! Run configuration
//!
//! Parameter ranges per technology generation, expansion axes and sampler
//! settings. Every field has a default so a partial JSON file is enough.

use crate::lut::TableVariant;
use crate::sampler::{FloatRange, IntRange, SeedMode, VariationParams};
use crate::{Decile, Generation, Result, UqError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// How often bounded fields are redrawn during expansion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleGranularity {
    /// Once per (generation, frequency, load level), shared by every decile
    /// and iteration of that combination
    #[default]
    PerFrequencyLoad,
    /// Fresh draw for every record
    PerRecord,
}

/// Whether records carry a sampled interference margin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterferenceMode {
    /// Interference term fixed at 0 dB (CNR)
    #[default]
    None,
    /// Interference margin drawn from `interference_db` (SINR)
    Sampled,
}

/// Unit cost ranges, USD
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostRanges {
    pub sector_antenna_usd: IntRange,
    pub remote_radio_unit_usd: IntRange,
    pub io_fronthaul_usd: IntRange,
    pub control_unit_usd: IntRange,
    pub cooling_fans_usd: IntRange,
    pub battery_power_usd: IntRange,
    pub bbu_cabinet_usd: IntRange,
    pub tower_usd: IntRange,
    pub civil_materials_usd: IntRange,
    pub router_usd: IntRange,
    pub transportation_usd: IntRange,
    pub installation_usd: IntRange,
    pub site_rental_usd: IntRange,
    pub base_station_energy_usd: IntRange,
    pub staff_costs_usd: IntRange,
    pub fiber_link_usd: IntRange,
    pub spectrum_usd_per_mhz_pop: FloatRange,
    pub discount_rate_pct: f64,
    pub assessment_years: u32,
}

impl Default for CostRanges {
    fn default() -> Self {
        Self {
            sector_antenna_usd: IntRange::new(1400, 1600),
            remote_radio_unit_usd: IntRange::new(3400, 3600),
            io_fronthaul_usd: IntRange::new(1400, 1600),
            control_unit_usd: IntRange::new(1900, 2100),
            cooling_fans_usd: IntRange::new(240, 260),
            battery_power_usd: IntRange::new(9000, 11000),
            bbu_cabinet_usd: IntRange::new(190, 210),
            tower_usd: IntRange::new(4500, 5500),
            civil_materials_usd: IntRange::new(4500, 5500),
            router_usd: IntRange::new(1500, 2200),
            transportation_usd: IntRange::new(1200, 1500),
            installation_usd: IntRange::new(4500, 5500),
            site_rental_usd: IntRange::new(900, 1200),
            base_station_energy_usd: IntRange::new(240, 260),
            staff_costs_usd: IntRange::new(20000, 60000),
            fiber_link_usd: IntRange::new(8000, 15000),
            spectrum_usd_per_mhz_pop: FloatRange::new(0.0005, 0.0015),
            discount_rate_pct: 7.0,
            assessment_years: 10,
        }
    }
}

impl CostRanges {
    pub fn validate(&self) -> Result<()> {
        let ints = [
            ("sector_antenna_usd", &self.sector_antenna_usd),
            ("remote_radio_unit_usd", &self.remote_radio_unit_usd),
            ("io_fronthaul_usd", &self.io_fronthaul_usd),
            ("control_unit_usd", &self.control_unit_usd),
            ("cooling_fans_usd", &self.cooling_fans_usd),
            ("battery_power_usd", &self.battery_power_usd),
            ("bbu_cabinet_usd", &self.bbu_cabinet_usd),
            ("tower_usd", &self.tower_usd),
            ("civil_materials_usd", &self.civil_materials_usd),
            ("router_usd", &self.router_usd),
            ("transportation_usd", &self.transportation_usd),
            ("installation_usd", &self.installation_usd),
            ("site_rental_usd", &self.site_rental_usd),
            ("base_station_energy_usd", &self.base_station_energy_usd),
            ("staff_costs_usd", &self.staff_costs_usd),
            ("fiber_link_usd", &self.fiber_link_usd),
        ];
        for (field, range) in ints {
            range.validate(field)?;
        }
        self.spectrum_usd_per_mhz_pop
            .validate("spectrum_usd_per_mhz_pop")?;
        if !(self.discount_rate_pct.is_finite() && self.discount_rate_pct > -100.0) {
            return Err(UqError::InvalidParameter(format!(
                "discount rate {}% out of range",
                self.discount_rate_pct
            )));
        }
        Ok(())
    }
}

/// Material mass ranges, kg per site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialRanges {
    pub bbu_rru_pcb_kg: IntRange,
    pub bbu_rru_aluminium_kg: IntRange,
    pub copper_antenna_kg: IntRange,
    pub aluminium_antenna_kg: IntRange,
    pub pvc_antenna_kg: IntRange,
    pub iron_antenna_kg: IntRange,
    pub steel_antenna_kg: IntRange,
    pub steel_tower_kg: IntRange,
    pub aluminium_frame_kg: IntRange,
    pub steel_pole_kg: IntRange,
    pub machine_concrete_kg: IntRange,
    pub machine_steel_kg: IntRange,
    pub basic_aluminium_device_kg: IntRange,
}

impl Default for MaterialRanges {
    fn default() -> Self {
        Self {
            bbu_rru_pcb_kg: IntRange::new(2, 4),
            bbu_rru_aluminium_kg: IntRange::new(10, 15),
            copper_antenna_kg: IntRange::new(2, 4),
            aluminium_antenna_kg: IntRange::new(8, 12),
            pvc_antenna_kg: IntRange::new(3, 5),
            iron_antenna_kg: IntRange::new(4, 6),
            steel_antenna_kg: IntRange::new(10, 14),
            steel_tower_kg: IntRange::new(3500, 4500),
            aluminium_frame_kg: IntRange::new(40, 60),
            steel_pole_kg: IntRange::new(100, 150),
            machine_concrete_kg: IntRange::new(8000, 12000),
            machine_steel_kg: IntRange::new(400, 600),
            basic_aluminium_device_kg: IntRange::new(20, 30),
        }
    }
}

impl MaterialRanges {
    pub fn validate(&self) -> Result<()> {
        let ranges = [
            ("bbu_rru_pcb_kg", &self.bbu_rru_pcb_kg),
            ("bbu_rru_aluminium_kg", &self.bbu_rru_aluminium_kg),
            ("copper_antenna_kg", &self.copper_antenna_kg),
            ("aluminium_antenna_kg", &self.aluminium_antenna_kg),
            ("pvc_antenna_kg", &self.pvc_antenna_kg),
            ("iron_antenna_kg", &self.iron_antenna_kg),
            ("steel_antenna_kg", &self.steel_antenna_kg),
            ("steel_tower_kg", &self.steel_tower_kg),
            ("aluminium_frame_kg", &self.aluminium_frame_kg),
            ("steel_pole_kg", &self.steel_pole_kg),
            ("machine_concrete_kg", &self.machine_concrete_kg),
            ("machine_steel_kg", &self.machine_steel_kg),
            ("basic_aluminium_device_kg", &self.basic_aluminium_device_kg),
        ];
        for (field, range) in ranges {
            range.validate(field)?;
        }
        Ok(())
    }
}

/// Emission-side ranges and fixed carbon factors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionRanges {
    pub materials: MaterialRanges,

    /// Per-user device masses, kg
    pub smartphone_kg: FloatRange,
    pub ict_equipment_kg: FloatRange,
    pub power_supply_kg: FloatRange,
    pub lithium_battery_kg: FloatRange,
    /// Add device manufacturing to the manufacturing phase
    pub include_devices: bool,

    pub consumption_lt_per_km: FloatRange,
    pub machine_fuel_eff_lt_per_hr: IntRange,
    pub machine_operation_hrs: IntRange,

    /// Annual energy use, kWh
    pub smartphone_kwh: FloatRange,
    pub ict_kwh: FloatRange,
    pub base_band_unit_kwh: FloatRange,
    pub radio_frequency_kwh: FloatRange,
    pub epc_center_kwh: FloatRange,

    pub factors: CarbonFactors,
    /// USD per tonne CO2e
    pub social_carbon_cost_usd: f64,
}

impl Default for EmissionRanges {
    fn default() -> Self {
        Self {
            materials: MaterialRanges::default(),
            smartphone_kg: FloatRange::new(0.15, 0.25),
            ict_equipment_kg: FloatRange::new(3.0, 5.0),
            power_supply_kg: FloatRange::new(0.5, 1.5),
            lithium_battery_kg: FloatRange::new(0.2, 0.5),
            include_devices: false,
            consumption_lt_per_km: FloatRange::new(0.1, 0.3),
            machine_fuel_eff_lt_per_hr: IntRange::new(10, 20),
            machine_operation_hrs: IntRange::new(40, 80),
            smartphone_kwh: FloatRange::new(4.0, 6.0),
            ict_kwh: FloatRange::new(40.0, 60.0),
            base_band_unit_kwh: FloatRange::new(4000.0, 6000.0),
            radio_frequency_kwh: FloatRange::new(7000.0, 9000.0),
            epc_center_kwh: FloatRange::new(1.0e6, 1.5e6),
            factors: CarbonFactors::default(),
            social_carbon_cost_usd: 75.0,
        }
    }
}

impl EmissionRanges {
    pub fn validate(&self) -> Result<()> {
        self.materials.validate()?;
        let floats = [
            ("smartphone_kg", &self.smartphone_kg),
            ("ict_equipment_kg", &self.ict_equipment_kg),
            ("power_supply_kg", &self.power_supply_kg),
            ("lithium_battery_kg", &self.lithium_battery_kg),
            ("consumption_lt_per_km", &self.consumption_lt_per_km),
            ("smartphone_kwh", &self.smartphone_kwh),
            ("ict_kwh", &self.ict_kwh),
            ("base_band_unit_kwh", &self.base_band_unit_kwh),
            ("radio_frequency_kwh", &self.radio_frequency_kwh),
            ("epc_center_kwh", &self.epc_center_kwh),
        ];
        for (field, range) in floats {
            range.validate(field)?;
        }
        self.machine_fuel_eff_lt_per_hr
            .validate("machine_fuel_eff_lt_per_hr")?;
        self.machine_operation_hrs.validate("machine_operation_hrs")?;
        Ok(())
    }
}

/// Carbon factors, kg CO2e per kg of material (per litre for diesel, per kWh
/// for electricity, per km for container shipping)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarbonFactors {
    pub pcb_kg_co2e: f64,
    pub aluminium_kg_co2e: f64,
    pub copper_kg_co2e: f64,
    pub pvc_kg_co2e: f64,
    pub iron_kg_co2e: f64,
    pub steel_kg_co2e: f64,
    pub concrete_kg_co2e: f64,
    pub device_kg_co2e: f64,
    pub electricity_kg_co2e: f64,
    pub diesel_factor_kgco2e: f64,
    pub container_ship_kgco2e: f64,
    /// End-of-life treatment
    pub metals_factor_kgco2e: f64,
    pub plastics_factor_kgco2e: f64,
}

impl Default for CarbonFactors {
    fn default() -> Self {
        Self {
            pcb_kg_co2e: 29.0,
            aluminium_kg_co2e: 9.16,
            copper_kg_co2e: 4.0,
            pvc_kg_co2e: 2.41,
            iron_kg_co2e: 2.03,
            steel_kg_co2e: 1.85,
            concrete_kg_co2e: 0.13,
            device_kg_co2e: 20.0,
            electricity_kg_co2e: 0.5,
            diesel_factor_kgco2e: 2.68,
            container_ship_kgco2e: 0.016,
            metals_factor_kgco2e: 0.98,
            plastics_factor_kgco2e: 2.34,
        }
    }
}

/// Fixed configuration and sampling ranges for one technology generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnologyParams {
    pub frequencies_mhz: Vec<f64>,
    pub channel_bandwidth_mhz: f64,
    pub antenna_sectors: u32,
    pub system_temperature_k: f64,
    pub shadow_fading_db: f64,
    pub building_penetration_loss_db: f64,

    pub transmitter_height_m: IntRange,
    pub user_antenna_height_m: IntRange,
    pub transmitter_power_dbm: IntRange,
    pub transmitter_gain_dbi: IntRange,
    pub user_antenna_gain_dbi: IntRange,
    pub user_antenna_loss_db: IntRange,
    pub interference_db: IntRange,

    /// Side of the transmitter placement grid; receivers use a grid 5 km larger
    pub grid_length_km: f64,
    /// Sample the link distance directly instead of from coordinates
    pub distance_km: Option<FloatRange>,

    pub costs: CostRanges,
    pub emissions: EmissionRanges,
}

impl Default for TechnologyParams {
    fn default() -> Self {
        Self {
            frequencies_mhz: vec![700.0, 1800.0],
            channel_bandwidth_mhz: 20.0,
            antenna_sectors: 3,
            system_temperature_k: 294.0,
            shadow_fading_db: 0.0,
            building_penetration_loss_db: 12.0,
            transmitter_height_m: IntRange::new(30, 50),
            user_antenna_height_m: IntRange::new(1, 10),
            transmitter_power_dbm: IntRange::new(40, 45),
            transmitter_gain_dbi: IntRange::new(16, 23),
            user_antenna_gain_dbi: IntRange::new(0, 2),
            user_antenna_loss_db: IntRange::new(0, 2),
            interference_db: IntRange::new(0, 3),
            grid_length_km: 20.0,
            distance_km: None,
            costs: CostRanges::default(),
            emissions: EmissionRanges::default(),
        }
    }
}

impl TechnologyParams {
    /// Defaults for a generation: 4G at 700/1800 MHz, 5G at 600/700 MHz
    pub fn for_generation(generation: Generation) -> Self {
        match generation {
            Generation::FourG => Self::default(),
            Generation::FiveG => Self {
                frequencies_mhz: vec![600.0, 700.0],
                ..Self::default()
            },
        }
    }

    pub fn validate(&self, generation: Generation) -> Result<()> {
        if self.frequencies_mhz.is_empty() {
            return Err(UqError::InvalidParameter(format!(
                "{} has no carrier frequencies",
                generation
            )));
        }
        if let Some(f) = self
            .frequencies_mhz
            .iter()
            .find(|f| !(f.is_finite() && **f > 0.0))
        {
            return Err(UqError::InvalidParameter(format!(
                "{} frequency {} MHz must be positive",
                generation, f
            )));
        }
        if !(self.channel_bandwidth_mhz.is_finite() && self.channel_bandwidth_mhz > 0.0) {
            return Err(UqError::InvalidParameter(format!(
                "{} channel bandwidth must be positive",
                generation
            )));
        }
        if !(self.grid_length_km.is_finite() && self.grid_length_km >= 0.0) {
            return Err(UqError::InvalidParameter(format!(
                "{} grid length must be non-negative",
                generation
            )));
        }

        self.transmitter_height_m.validate("transmitter_height_m")?;
        self.user_antenna_height_m.validate("user_antenna_height_m")?;
        self.transmitter_power_dbm.validate("transmitter_power_dbm")?;
        self.transmitter_gain_dbi.validate("transmitter_gain_dbi")?;
        self.user_antenna_gain_dbi.validate("user_antenna_gain_dbi")?;
        self.user_antenna_loss_db.validate("user_antenna_loss_db")?;
        self.interference_db.validate("interference_db")?;
        if let Some(distance) = &self.distance_km {
            distance.validate("distance_km")?;
        }
        self.costs.validate()?;
        self.emissions.validate()
    }
}

/// Busy-hour demand assumptions used for network dimensioning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemandParams {
    /// Share of daily traffic in the busiest hour, percent
    pub traffic_busy_hour_pct: f64,
    /// Share of users with a smartphone, percent
    pub smartphone_penetration_pct: f64,
    /// Demand level whose capacity rows drive site counts, GB/month
    pub dimensioning_demand_gb: f64,
}

impl Default for DemandParams {
    fn default() -> Self {
        Self {
            traffic_busy_hour_pct: 15.0,
            smartphone_penetration_pct: 50.0,
            dimensioning_demand_gb: 30.0,
        }
    }
}

/// Full simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub technologies: BTreeMap<Generation, TechnologyParams>,
    pub deciles: Vec<Decile>,
    /// Load axis of the expansion: mean monthly demand per user, GB
    pub demand_levels_gb: Vec<f64>,
    pub iterations: usize,
    pub variation: VariationParams,
    pub seed_mode: SeedMode,
    /// Seed for the expansion generator
    pub sampling_seed: u64,
    pub resample: ResampleGranularity,
    pub interference: InterferenceMode,
    pub lut_variant: TableVariant,
    pub demand: DemandParams,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            technologies: Generation::ALL
                .iter()
                .map(|g| (*g, TechnologyParams::for_generation(*g)))
                .collect(),
            deciles: Decile::all(),
            demand_levels_gb: vec![10.0, 20.0, 30.0],
            iterations: 50,
            variation: VariationParams::default(),
            seed_mode: SeedMode::Legacy,
            sampling_seed: 10,
            resample: ResampleGranularity::PerFrequencyLoad,
            interference: InterferenceMode::None,
            lut_variant: TableVariant::Mimo,
            demand: DemandParams::default(),
        }
    }
}

impl SimulationConfig {
    /// Load from a JSON file and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(UqError::MissingInput(path.to_path_buf()));
        }
        let reader = BufReader::new(File::open(path)?);
        let config: SimulationConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        info!(
            "Loaded configuration from {:?}: {} technologies, {} deciles, {} iterations",
            path,
            config.technologies.len(),
            config.deciles.len(),
            config.iterations
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.technologies.is_empty() {
            return Err(UqError::InvalidParameter(
                "no technologies configured".to_string(),
            ));
        }
        for (generation, params) in &self.technologies {
            params.validate(*generation)?;
        }
        if self.deciles.is_empty() {
            return Err(UqError::InvalidParameter(
                "no deciles configured".to_string(),
            ));
        }
        if self.demand_levels_gb.is_empty() {
            return Err(UqError::InvalidParameter(
                "no demand levels configured".to_string(),
            ));
        }
        if self.variation.draws < self.iterations {
            return Err(UqError::IterationOutOfRange {
                iteration: self.iterations.saturating_sub(1),
                draws: self.variation.draws,
            });
        }
        if !(self.variation.mu.is_finite() && self.variation.mu > 0.0) {
            return Err(UqError::InvalidParameter(format!(
                "variation mu must be positive, got {}",
                self.variation.mu
            )));
        }
        if !(self.variation.sigma.is_finite() && self.variation.sigma >= 0.0) {
            return Err(UqError::InvalidParameter(format!(
                "variation sigma must be finite and non-negative, got {}",
                self.variation.sigma
            )));
        }
        Ok(())
    }

    /// Number of records `expand` produces
    pub fn record_count(&self) -> usize {
        self.technologies
            .values()
            .map(|t| t.frequencies_mhz.len())
            .sum::<usize>()
            * self.demand_levels_gb.len()
            * self.iterations
            * self.deciles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimulationConfig::default();
        config.validate().unwrap();
        assert_eq!(config.technologies.len(), 2);
        assert_eq!(
            config.technologies[&Generation::FiveG].frequencies_mhz,
            vec![600.0, 700.0]
        );
        // 2 generations x 2 frequencies x 3 loads x 50 iterations x 10 deciles
        assert_eq!(config.record_count(), 6000);
    }

    #[test]
    fn test_iterations_bounded_by_draws() {
        let config = SimulationConfig {
            iterations: 200,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(UqError::IterationOutOfRange { draws: 100, .. })
        ));
    }

    #[test]
    fn test_empty_deciles_rejected() {
        let config = SimulationConfig {
            deciles: Vec::new(),
            ..SimulationConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(&err, UqError::InvalidParameter(msg) if msg.contains("deciles")));
    }

    #[test]
    fn test_bad_sigma_rejected() {
        for sigma in [-1.0, f64::NAN, f64::INFINITY] {
            let mut config = SimulationConfig::default();
            config.variation.sigma = sigma;
            assert!(matches!(
                config.validate(),
                Err(UqError::InvalidParameter(_))
            ));
        }
        let mut config = SimulationConfig::default();
        config.variation.sigma = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut config = SimulationConfig::default();
        if let Some(params) = config.technologies.get_mut(&Generation::FourG) {
            params.costs.tower_usd = IntRange::new(5500, 4500);
        }
        let err = config.validate().unwrap_err();
        assert!(matches!(err, UqError::InvalidRange { ref field, .. } if field == "tower_usd"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"iterations": 5, "seed_mode": "full", "deciles": ["Decile 2", "Decile 9"]}}"#
        )
        .unwrap();

        let config = SimulationConfig::load(file.path()).unwrap();
        assert_eq!(config.iterations, 5);
        assert_eq!(config.seed_mode, SeedMode::Full);
        assert_eq!(config.deciles.len(), 2);
        assert_eq!(config.variation.draws, 100);
        assert_eq!(config.resample, ResampleGranularity::PerFrequencyLoad);
    }

    #[test]
    fn test_missing_config_file() {
        let err = SimulationConfig::load("/nonexistent/uq.json").unwrap_err();
        assert!(matches!(err, UqError::MissingInput(_)));
    }
}
