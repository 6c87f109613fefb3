//! Decile aggregates and site counts
//!
//! Both tables are produced outside the engine (geoprocessing and network
//! dimensioning) and are only read here, keyed by decile.

use crate::loader;
use crate::{Decile, Generation, Result, UqError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Population, area, poverty and affordability summary of one decile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecileAggregate {
    pub decile: Decile,
    pub total_population: f64,
    pub total_poor_unconnected: f64,
    pub total_area_sqkm: f64,
    /// Mean unconnected population per region, used as users per site
    pub mean_poor_connected: f64,
    pub mean_area_sqkm: f64,
    /// Mean maximum centroid distance, used as road haulage distance
    pub mean_distance_km: f64,
    #[serde(default)]
    pub maritime_km: Option<f64>,
    #[serde(default, rename = "cost_per_1GB_usd")]
    pub cost_per_1gb_usd: Option<f64>,
    #[serde(default)]
    pub monthly_income_usd: Option<f64>,
    #[serde(default)]
    pub cost_per_month_usd: Option<f64>,
    #[serde(default)]
    pub arpu_usd: Option<f64>,
    #[serde(default)]
    pub adoption_rate: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct DecileTable {
    rows: BTreeMap<Decile, DecileAggregate>,
}

impl DecileTable {
    /// Index rows by decile; a repeated decile is a configuration error
    pub fn from_rows(rows: Vec<DecileAggregate>) -> Result<Self> {
        let mut indexed = BTreeMap::new();
        for row in rows {
            let decile = row.decile;
            if indexed.insert(decile, row).is_some() {
                return Err(UqError::InvalidParameter(format!(
                    "duplicate aggregate row for {}",
                    decile
                )));
            }
        }
        Ok(Self { rows: indexed })
    }

    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let rows: Vec<DecileAggregate> = loader::read_csv(path)?;
        let table = Self::from_rows(rows)?;
        info!("Loaded {} decile aggregates from {:?}", table.len(), path);
        Ok(table)
    }

    pub fn get(&self, decile: Decile) -> Option<&DecileAggregate> {
        self.rows.get(&decile)
    }

    pub fn require(&self, decile: Decile) -> Result<&DecileAggregate> {
        self.get(decile).ok_or(UqError::MissingAggregate(decile))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecileAggregate> {
        self.rows.values()
    }
}

/// One row of the site-count table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteCountRow {
    pub decile: Decile,
    pub cell_generation: Generation,
    pub no_of_required_sites: u64,
}

/// Required sites per (decile, generation)
#[derive(Debug, Clone, Default)]
pub struct SiteCountTable {
    counts: BTreeMap<(Decile, Generation), u64>,
}

impl SiteCountTable {
    /// Later rows for the same key replace earlier ones
    pub fn from_rows(rows: impl IntoIterator<Item = SiteCountRow>) -> Self {
        let mut counts = BTreeMap::new();
        for row in rows {
            if counts
                .insert((row.decile, row.cell_generation), row.no_of_required_sites)
                .is_some()
            {
                warn!(
                    "Repeated site count for {} / {}, keeping the last",
                    row.decile, row.cell_generation
                );
            }
        }
        Self { counts }
    }

    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let rows: Vec<SiteCountRow> = loader::read_csv(path)?;
        let table = Self::from_rows(rows);
        info!("Loaded {} site counts from {:?}", table.len(), path);
        Ok(table)
    }

    pub fn insert(&mut self, decile: Decile, generation: Generation, sites: u64) {
        self.counts.insert((decile, generation), sites);
    }

    pub fn get(&self, decile: Decile, generation: Generation) -> Option<u64> {
        self.counts.get(&(decile, generation)).copied()
    }

    pub fn require(&self, decile: Decile, generation: Generation) -> Result<u64> {
        self.get(decile, generation)
            .ok_or(UqError::MissingSiteCount(decile, generation))
    }

    pub fn rows(&self) -> Vec<SiteCountRow> {
        self.counts
            .iter()
            .map(|(&(decile, cell_generation), &no_of_required_sites)| SiteCountRow {
                decile,
                cell_generation,
                no_of_required_sites,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub(crate) fn aggregate(rank: u8) -> DecileAggregate {
        DecileAggregate {
            decile: Decile::new(rank).unwrap(),
            total_population: 1_000_000.0,
            total_poor_unconnected: 400_000.0,
            total_area_sqkm: 50_000.0,
            mean_poor_connected: 2_500.0,
            mean_area_sqkm: 300.0,
            mean_distance_km: 35.0,
            maritime_km: Some(900.0),
            cost_per_1gb_usd: Some(2.5),
            monthly_income_usd: Some(120.0),
            cost_per_month_usd: Some(8.0),
            arpu_usd: Some(4.0),
            adoption_rate: Some(0.35),
        }
    }

    #[test]
    fn test_decile_csv_with_blank_columns() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "decile,total_population,total_poor_unconnected,total_area_sqkm,mean_poor_connected,\
             mean_area_sqkm,mean_distance_km,maritime_km,cost_per_1GB_usd,monthly_income_usd,\
             cost_per_month_usd,arpu_usd,adoption_rate"
        )
        .unwrap();
        writeln!(file, "Decile 1,1000,400,50,25,3,35,,2.5,120,8,4,0.3").unwrap();
        writeln!(file, "Decile 2,2000,800,40,50,2,20,600,,,,,").unwrap();
        file.flush().unwrap();

        let table = DecileTable::from_csv(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        let d1 = table.require(Decile::new(1).unwrap()).unwrap();
        assert_eq!(d1.maritime_km, None);
        assert_eq!(d1.cost_per_1gb_usd, Some(2.5));
        let d2 = table.require(Decile::new(2).unwrap()).unwrap();
        assert_eq!(d2.maritime_km, Some(600.0));
        assert!(matches!(
            table.require(Decile::new(3).unwrap()),
            Err(UqError::MissingAggregate(_))
        ));
    }

    #[test]
    fn test_duplicate_decile_rejected() {
        let err = DecileTable::from_rows(vec![aggregate(1), aggregate(1)]).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_site_counts_keyed_by_generation() {
        let d = Decile::new(4).unwrap();
        let table = SiteCountTable::from_rows(vec![
            SiteCountRow { decile: d, cell_generation: Generation::FourG, no_of_required_sites: 12 },
            SiteCountRow { decile: d, cell_generation: Generation::FiveG, no_of_required_sites: 18 },
        ]);
        assert_eq!(table.require(d, Generation::FourG).unwrap(), 12);
        assert_eq!(table.require(d, Generation::FiveG).unwrap(), 18);
        let err = table.require(Decile::new(5).unwrap(), Generation::FourG).unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(table.rows().len(), 2);
    }
}
