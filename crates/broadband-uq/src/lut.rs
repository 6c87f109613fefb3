//! CQI to spectral-efficiency lookup
//!
//! Static tables after ETSI TS 38.214 (CQI table 1 for single-antenna links,
//! 8x8 MIMO figures for 5G). Rows are ordered by CNR/SINR threshold per
//! technology; a lookup returns the efficiency of the lower bracketing row and
//! never interpolates.

use crate::loader;
use crate::{Generation, Result, UqError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Which static table to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableVariant {
    /// 4G 1x1 and 5G 1x1
    SingleAntenna,
    /// 4G 1x1 and 5G 8x8
    #[default]
    Mimo,
}

/// One row of the lookup table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LutRow {
    #[serde(rename = "technology")]
    pub generation: Generation,
    pub mimo: String,
    pub cqi: u8,
    pub modulation: String,
    /// Code rate x 1024
    pub coding_rate: u16,
    /// bits/s/Hz
    pub spectral_efficiency: f64,
    pub threshold_db: f64,
}

// (cqi, modulation, code rate x1024, efficiency, threshold dB)
type RawRow = (u8, &'static str, u16, f64, f64);

const CQI_TABLE_1X1: [RawRow; 15] = [
    (1, "QPSK", 78, 0.1523, -6.7),
    (2, "QPSK", 120, 0.2344, -4.7),
    (3, "QPSK", 193, 0.377, -2.3),
    (4, "QPSK", 308, 0.6016, 0.2),
    (5, "QPSK", 449, 0.877, 2.4),
    (6, "QPSK", 602, 1.1758, 4.3),
    (7, "16QAM", 378, 1.4766, 5.9),
    (8, "16QAM", 490, 1.9141, 8.1),
    (9, "16QAM", 616, 2.4063, 10.3),
    (10, "64QAM", 466, 2.7305, 11.7),
    (11, "64QAM", 567, 3.3223, 14.1),
    (12, "64QAM", 666, 3.9023, 16.3),
    (13, "64QAM", 772, 4.5234, 18.7),
    (14, "64QAM", 973, 5.1152, 21.0),
    (15, "64QAM", 948, 5.5547, 22.7),
];

const NR_TABLE_8X8: [RawRow; 15] = [
    (1, "QPSK", 78, 0.30, -6.7),
    (2, "QPSK", 193, 2.05, -4.7),
    (3, "QPSK", 449, 4.42, -2.3),
    (4, "16QAM", 378, 6.40, 0.2),
    (5, "16QAM", 490, 8.00, 2.4),
    (6, "16QAM", 616, 10.82, 4.3),
    (7, "64QAM", 466, 12.40, 5.9),
    (8, "64QAM", 567, 16.00, 8.1),
    (9, "64QAM", 666, 19.00, 10.3),
    (10, "64QAM", 772, 22.00, 11.7),
    (11, "64QAM", 873, 28.00, 14.1),
    (12, "256QAM", 711, 32.00, 16.3),
    (13, "256QAM", 797, 38.00, 18.7),
    (14, "256QAM", 885, 44.00, 21.0),
    (15, "256QAM", 948, 50.00, 22.7),
];

fn expand(generation: Generation, mimo: &str, raw: &[RawRow]) -> Vec<LutRow> {
    raw.iter()
        .map(|&(cqi, modulation, coding_rate, spectral_efficiency, threshold_db)| LutRow {
            generation,
            mimo: mimo.to_string(),
            cqi,
            modulation: modulation.to_string(),
            coding_rate,
            spectral_efficiency,
            threshold_db,
        })
        .collect()
}

/// Validated lookup table, rows grouped by technology
#[derive(Debug, Clone)]
pub struct SpectralEfficiencyTable {
    rows: BTreeMap<Generation, Vec<LutRow>>,
}

impl SpectralEfficiencyTable {
    /// Build from rows in table order, rejecting non-increasing thresholds
    pub fn from_rows(rows: Vec<LutRow>) -> Result<Self> {
        let mut grouped: BTreeMap<Generation, Vec<LutRow>> = BTreeMap::new();
        for row in rows {
            if !row.threshold_db.is_finite() || !row.spectral_efficiency.is_finite() {
                return Err(UqError::InvalidParameter(format!(
                    "non-finite lookup row {} CQI {}",
                    row.generation, row.cqi
                )));
            }
            grouped.entry(row.generation).or_default().push(row);
        }

        for (generation, rows) in &grouped {
            for (i, pair) in rows.windows(2).enumerate() {
                if pair[1].threshold_db <= pair[0].threshold_db {
                    return Err(UqError::NonMonotonicTable {
                        generation: *generation,
                        row: i + 1,
                    });
                }
            }
        }

        Ok(Self { rows: grouped })
    }

    pub fn single_antenna() -> Self {
        let mut rows = expand(Generation::FourG, "1x1", &CQI_TABLE_1X1);
        rows.extend(expand(Generation::FiveG, "1x1", &CQI_TABLE_1X1));
        Self::grouped(rows)
    }

    pub fn mimo() -> Self {
        let mut rows = expand(Generation::FourG, "1x1", &CQI_TABLE_1X1);
        rows.extend(expand(Generation::FiveG, "8x8", &NR_TABLE_8X8));
        Self::grouped(rows)
    }

    pub fn for_variant(variant: TableVariant) -> Self {
        match variant {
            TableVariant::SingleAntenna => Self::single_antenna(),
            TableVariant::Mimo => Self::mimo(),
        }
    }

    /// Load a table from CSV (`technology,mimo,cqi,modulation,coding_rate,spectral_efficiency,threshold_db`)
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let rows: Vec<LutRow> = loader::read_csv(path.as_ref())?;
        info!("Loaded {} lookup rows from {:?}", rows.len(), path.as_ref());
        Self::from_rows(rows)
    }

    // Static tables are ordered by construction.
    fn grouped(rows: Vec<LutRow>) -> Self {
        let mut grouped: BTreeMap<Generation, Vec<LutRow>> = BTreeMap::new();
        for row in rows {
            grouped.entry(row.generation).or_default().push(row);
        }
        Self { rows: grouped }
    }

    /// Rows for one technology, in threshold order
    pub fn rows_for(&self, generation: Generation) -> Result<&[LutRow]> {
        self.rows
            .get(&generation)
            .map(Vec::as_slice)
            .filter(|rows| !rows.is_empty())
            .ok_or(UqError::UnknownTechnology(generation))
    }

    pub fn generations(&self) -> impl Iterator<Item = Generation> + '_ {
        self.rows.keys().copied()
    }

    /// Spectral efficiency (bits/s/Hz) for a CNR/SINR in dB.
    ///
    /// Below the first threshold the first row applies, at or above the last
    /// threshold the last row applies; otherwise the row whose interval
    /// `[threshold, next_threshold)` contains the value.
    pub fn spectral_efficiency(&self, generation: Generation, cnr_db: f64) -> Result<f64> {
        let rows = self.rows_for(generation)?;
        if cnr_db.is_nan() {
            return Err(UqError::NonFinite {
                quantity: "cnr_db",
                value: cnr_db,
            });
        }

        let first = &rows[0];
        let last = &rows[rows.len() - 1];
        if cnr_db < first.threshold_db {
            return Ok(first.spectral_efficiency);
        }
        if cnr_db >= last.threshold_db {
            return Ok(last.spectral_efficiency);
        }

        let upper = rows.partition_point(|r| r.threshold_db <= cnr_db);
        Ok(rows[upper - 1].spectral_efficiency)
    }
}

impl Default for SpectralEfficiencyTable {
    fn default() -> Self {
        Self::mimo()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_bound_used() {
        let lut = SpectralEfficiencyTable::mimo();
        // Between CQI 6 (4.3 dB) and CQI 7 (5.9 dB)
        assert_eq!(lut.spectral_efficiency(Generation::FourG, 5.0).unwrap(), 1.1758);
        // Exactly on a threshold belongs to that row
        assert_eq!(lut.spectral_efficiency(Generation::FourG, 5.9).unwrap(), 1.4766);
        assert_eq!(lut.spectral_efficiency(Generation::FiveG, 10.0).unwrap(), 16.00);
    }

    #[test]
    fn test_clamped_at_extremes() {
        let lut = SpectralEfficiencyTable::mimo();
        assert_eq!(lut.spectral_efficiency(Generation::FourG, -40.0).unwrap(), 0.1523);
        assert_eq!(lut.spectral_efficiency(Generation::FourG, 22.7).unwrap(), 5.5547);
        assert_eq!(lut.spectral_efficiency(Generation::FourG, 80.0).unwrap(), 5.5547);
        assert_eq!(lut.spectral_efficiency(Generation::FiveG, f64::INFINITY).unwrap(), 50.0);
        assert_eq!(lut.spectral_efficiency(Generation::FiveG, f64::NEG_INFINITY).unwrap(), 0.30);
    }

    #[test]
    fn test_nan_rejected() {
        let lut = SpectralEfficiencyTable::mimo();
        let err = lut.spectral_efficiency(Generation::FourG, f64::NAN).unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_unknown_technology_is_fatal() {
        let rows = expand(Generation::FourG, "1x1", &CQI_TABLE_1X1);
        let lut = SpectralEfficiencyTable::from_rows(rows).unwrap();
        let err = lut.spectral_efficiency(Generation::FiveG, 3.0).unwrap_err();
        assert!(matches!(err, UqError::UnknownTechnology(Generation::FiveG)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_non_monotonic_rejected() {
        let mut rows = expand(Generation::FourG, "1x1", &CQI_TABLE_1X1);
        rows.swap(3, 4);
        let err = SpectralEfficiencyTable::from_rows(rows).unwrap_err();
        assert!(matches!(err, UqError::NonMonotonicTable { row: 4, .. }));
    }

    #[test]
    fn test_single_antenna_variant() {
        let lut = SpectralEfficiencyTable::for_variant(TableVariant::SingleAntenna);
        assert_eq!(lut.rows_for(Generation::FiveG).unwrap()[0].mimo, "1x1");
        assert_eq!(lut.spectral_efficiency(Generation::FiveG, 30.0).unwrap(), 5.5547);
        assert_eq!(lut.generations().count(), 2);
    }
}
