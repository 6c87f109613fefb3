//! Link budget and capacity
//!
//! Hata-Okamura path loss with a log-normal random-variation term, received
//! power, thermal noise, CNR/SINR, spectral efficiency from the CQI table and
//! channel, site and area capacity.
//!
//! All functions are pure. Distances at or below zero take a fixed `log10`
//! term of 1 instead of failing.

use crate::lut::SpectralEfficiencyTable;
use crate::scenario::{GridPoint, ScenarioRecord};
use crate::{Result, UqError};
use serde::{Deserialize, Serialize};

/// Boltzmann constant, J/K
pub const BOLTZMANN: f64 = 1.38e-23;

/// Receiver noise figure added to the thermal floor, dB
pub const NOISE_FIGURE_DB: f64 = 1.5;

/// Rural correction factor (dB)
pub fn rural_correction_db(frequency_mhz: f64) -> f64 {
    let log_f = frequency_mhz.log10();
    4.78 * log_f.powi(2) + 18.33 * log_f - 40.94
}

/// Urban/city correction for the user antenna height (dB)
pub fn city_correction_db(frequency_mhz: f64, user_antenna_height_m: f64) -> f64 {
    let log_f = frequency_mhz.log10();
    (1.1 * log_f - 0.7) * user_antenna_height_m - (1.56 * log_f - 0.8)
}

/// Hata-Okamura path loss (dB) plus the random-variation draw
pub fn path_loss_db(
    frequency_mhz: f64,
    transmitter_height_m: f64,
    user_antenna_height_m: f64,
    distance_km: f64,
    random_variation_db: f64,
) -> f64 {
    let log_f = frequency_mhz.log10();
    let log_h = transmitter_height_m.log10();
    let log_d = if distance_km > 0.0 {
        distance_km.log10()
    } else {
        1.0
    };

    69.55 + 26.16 * log_f - 13.82 * log_h
        - city_correction_db(frequency_mhz, user_antenna_height_m)
        + log_d * (44.9 - 6.55 * log_h)
        + random_variation_db
}

/// Received power at the user (dBm)
pub fn received_power_dbm(
    transmitter_power_dbm: f64,
    transmitter_gain_dbi: f64,
    path_loss_db: f64,
    shadow_fading_db: f64,
    penetration_loss_db: f64,
) -> f64 {
    (transmitter_power_dbm + transmitter_gain_dbi)
        - (path_loss_db + shadow_fading_db + penetration_loss_db)
}

/// Thermal noise floor over the channel (dBm)
pub fn noise_dbm(channel_bandwidth_mhz: f64, temperature_k: f64) -> f64 {
    10.0 * (BOLTZMANN * temperature_k * 1000.0).log10()
        + 10.0 * (channel_bandwidth_mhz * 1e6).log10()
        + NOISE_FIGURE_DB
}

/// Carrier-to-noise (or signal-to-interference-plus-noise) ratio (dB)
pub fn cnr_db(
    received_power_dbm: f64,
    noise_dbm: f64,
    user_antenna_gain_dbi: f64,
    user_antenna_loss_db: f64,
    interference_db: f64,
) -> f64 {
    (received_power_dbm + user_antenna_gain_dbi)
        - (noise_dbm + user_antenna_loss_db + interference_db)
}

pub fn channel_capacity_mbps(spectral_efficiency: f64, channel_bandwidth_mhz: f64) -> f64 {
    spectral_efficiency * channel_bandwidth_mhz
}

pub fn site_capacity_mbps(channel_capacity_mbps: f64, antenna_sectors: u32) -> f64 {
    channel_capacity_mbps * antenna_sectors as f64
}

/// Hexagonal cell area whose circumradius is twice the link distance; zero
/// for distances at or below zero
pub fn site_area_km2(distance_km: f64) -> f64 {
    if distance_km <= 0.0 {
        return 0.0;
    }
    let radius = 2.0 * distance_km;
    3.0 * 3f64.sqrt() / 2.0 * radius * radius
}

/// Capacity density; zero when the site has no area
pub fn area_capacity_mbps_km2(capacity_mbps: f64, site_area_km2: f64) -> f64 {
    if site_area_km2 > 0.0 {
        capacity_mbps / site_area_km2
    } else {
        0.0
    }
}

/// Straight-line distance between two grid points (km)
pub fn signal_path_km(from: GridPoint, to: GridPoint) -> f64 {
    (to.x_km - from.x_km).hypot(to.y_km - from.y_km)
}

/// Every intermediate of one link-budget evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkBudget {
    pub intersite_distance_km: f64,
    pub random_variation_db: f64,
    pub rural_correction_db: f64,
    pub city_correction_db: f64,
    pub path_loss_db: f64,
    pub received_power_dbm: f64,
    pub noise_dbm: f64,
    pub interference_db: f64,
    pub cnr_db: f64,
    pub spectral_efficiency_bpshz: f64,
    pub channel_capacity_mbps: f64,
    pub capacity_mbps: f64,
    pub site_area_sqkm: f64,
    pub capacity_mbps_km2: f64,
}

fn ensure_finite(quantity: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(UqError::NonFinite { quantity, value })
    }
}

/// Evaluate the link budget of one record against its variation vector
pub fn evaluate(
    record: &ScenarioRecord,
    lut: &SpectralEfficiencyTable,
    random_variation: &[f64],
) -> Result<LinkBudget> {
    let key = &record.key;
    let radio = &record.radio;

    let random_variation_db = *random_variation.get(key.iteration).ok_or(
        UqError::IterationOutOfRange {
            iteration: key.iteration,
            draws: random_variation.len(),
        },
    )?;

    if !(key.frequency_mhz > 0.0 && radio.transmitter_height_m > 0.0) {
        return Err(UqError::InvalidRecord(format!(
            "{} {} MHz: frequency and transmitter height must be positive",
            key.decile, key.frequency_mhz
        )));
    }

    let distance_km = radio
        .distance_km
        .unwrap_or_else(|| signal_path_km(radio.transmitter, radio.receiver));

    let path_loss = ensure_finite(
        "path_loss_db",
        path_loss_db(
            key.frequency_mhz,
            radio.transmitter_height_m,
            radio.user_antenna_height_m,
            distance_km,
            random_variation_db,
        ),
    )?;
    let received = received_power_dbm(
        radio.transmitter_power_dbm,
        radio.transmitter_gain_dbi,
        path_loss,
        radio.shadow_fading_db,
        radio.building_penetration_loss_db,
    );
    let noise = ensure_finite(
        "noise_dbm",
        noise_dbm(key.channel_bandwidth_mhz, radio.system_temperature_k),
    )?;
    let cnr = cnr_db(
        received,
        noise,
        radio.user_antenna_gain_dbi,
        radio.user_antenna_loss_db,
        radio.interference_db,
    );

    let spectral_efficiency = lut.spectral_efficiency(key.generation, cnr)?;
    let channel = channel_capacity_mbps(spectral_efficiency, key.channel_bandwidth_mhz);
    let capacity = site_capacity_mbps(channel, radio.antenna_sectors);
    let area = site_area_km2(distance_km);

    Ok(LinkBudget {
        intersite_distance_km: distance_km,
        random_variation_db,
        rural_correction_db: rural_correction_db(key.frequency_mhz),
        city_correction_db: city_correction_db(key.frequency_mhz, radio.user_antenna_height_m),
        path_loss_db: path_loss,
        received_power_dbm: received,
        noise_dbm: noise,
        interference_db: radio.interference_db,
        cnr_db: cnr,
        spectral_efficiency_bpshz: spectral_efficiency,
        channel_capacity_mbps: channel,
        capacity_mbps: capacity,
        site_area_sqkm: area,
        capacity_mbps_km2: area_capacity_mbps_km2(capacity, area),
    })
}
