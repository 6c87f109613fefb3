//! Network dimensioning
//!
//! Turns capacity results into the number of sites each decile needs: busy-hour
//! demand per user times the users per region, divided by site capacity,
//! averaged over the rows of one demand level. The 5G count of a decile is
//! 1.5 times its 4G count whenever a 4G count exists.

use crate::aggregates::{DecileTable, SiteCountTable};
use crate::config::DemandParams;
use crate::results::CapacityRow;
use crate::{Decile, Generation, Result, UqError};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Days per month in the demand model
pub const DAYS_PER_MONTH: f64 = 30.0;

/// 5G sites per 4G site in the same decile
pub const FIVE_G_SITE_FACTOR: f64 = 1.5;

/// Busy-hour demand of an average user, Mbps
pub fn user_demand_mbps(
    monthly_demand_gb: f64,
    traffic_busy_hour_pct: f64,
    smartphone_penetration_pct: f64,
) -> f64 {
    let daily_mbit = monthly_demand_gb * 1000.0 * 8.0 / DAYS_PER_MONTH;
    let busy_hour_mbps = daily_mbit * (traffic_busy_hour_pct / 100.0) / 3600.0;
    busy_hour_mbps * (smartphone_penetration_pct / 100.0)
}

/// Site counts per (decile, generation) from capacity rows.
///
/// Rows at other demand levels, without a decile aggregate, or with no
/// capacity are ignored.
pub fn required_sites(
    rows: &[CapacityRow],
    deciles: &DecileTable,
    demand: &DemandParams,
) -> Result<SiteCountTable> {
    let per_user = user_demand_mbps(
        demand.dimensioning_demand_gb,
        demand.traffic_busy_hour_pct,
        demand.smartphone_penetration_pct,
    );

    let mut sums: BTreeMap<(Decile, Generation), (f64, usize)> = BTreeMap::new();
    let mut no_aggregate = 0usize;
    let mut no_capacity = 0usize;

    for row in rows
        .iter()
        .filter(|r| (r.mean_monthly_demand_gb - demand.dimensioning_demand_gb).abs() < 1e-9)
    {
        let Some(aggregate) = deciles.get(row.decile) else {
            no_aggregate += 1;
            continue;
        };
        if !(row.capacity_mbps.is_finite() && row.capacity_mbps > 0.0) {
            no_capacity += 1;
            continue;
        }

        let required_mbps = per_user * aggregate.mean_poor_connected;
        let entry = sums.entry((row.decile, row.cell_generation)).or_insert((0.0, 0));
        entry.0 += required_mbps / row.capacity_mbps;
        entry.1 += 1;
    }

    if no_aggregate + no_capacity > 0 {
        warn!(
            "Dimensioning ignored {} rows without aggregates and {} without capacity",
            no_aggregate, no_capacity
        );
    }
    if sums.is_empty() {
        return Err(UqError::InvalidParameter(format!(
            "no usable capacity rows at {} GB/month",
            demand.dimensioning_demand_gb
        )));
    }

    let mut means: BTreeMap<(Decile, Generation), f64> = sums
        .into_iter()
        .map(|(key, (sum, n))| (key, sum / n as f64))
        .collect();

    let four_g: BTreeMap<Decile, f64> = means
        .iter()
        .filter(|((_, g), _)| *g == Generation::FourG)
        .map(|((d, _), v)| (*d, *v))
        .collect();
    for ((decile, generation), sites) in means.iter_mut() {
        if *generation == Generation::FiveG {
            if let Some(base) = four_g.get(decile) {
                *sites = base * FIVE_G_SITE_FACTOR;
            }
        }
    }

    let mut table = SiteCountTable::default();
    for ((decile, generation), sites) in means {
        let rounded = sites.round().max(0.0) as u64;
        debug!("{} {}: {:.2} sites -> {}", decile, generation, sites, rounded);
        table.insert(decile, generation, rounded);
    }

    info!(
        "Dimensioned {} (decile, generation) pairs at {:.4} Mbps per user",
        table.len(),
        per_user
    );
    Ok(table)
}
