//! Table I/O
//!
//! CSV for model results and external aggregate tables, JSON for scenario
//! tables and run reports. Every reader fails with `MissingInput` when the
//! file is absent so callers can tell "skip this stage" from a parse error.

use crate::scenario::ScenarioRecord;
use crate::{Result, UqError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{info, warn};

/// Fail with `MissingInput` unless `path` exists
pub fn require_input(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(UqError::MissingInput(path.to_path_buf()))
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Read every row of a headed CSV file
pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    require_input(path)?;
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, csv::Error>>()?;
    Ok(rows)
}

/// Write rows as a headed CSV file, creating parent directories
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!("Wrote {} rows to {:?}", rows.len(), path);
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    require_input(path)?;
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

/// Load a scenario table, dropping records that cannot be evaluated
pub fn load_scenarios(path: impl AsRef<Path>) -> Result<Vec<ScenarioRecord>> {
    let path = path.as_ref();
    info!("Loading scenarios from {:?}", path);

    let raw: Vec<ScenarioRecord> = read_json(path)?;
    let total = raw.len();
    let records: Vec<ScenarioRecord> = raw
        .into_iter()
        .filter(|r| {
            r.key.frequency_mhz.is_finite()
                && r.key.frequency_mhz > 0.0
                && r.key.channel_bandwidth_mhz.is_finite()
                && r.key.channel_bandwidth_mhz > 0.0
        })
        .collect();

    let skipped = total - records.len();
    if skipped > 0 {
        warn!("{} scenario records skipped for invalid frequency or bandwidth", skipped);
    }
    info!("Loaded {} scenario records ({} skipped)", records.len(), skipped);

    Ok(records)
}

pub fn save_scenarios(path: impl AsRef<Path>, records: &[ScenarioRecord]) -> Result<()> {
    let path = path.as_ref();
    write_json(path, records)?;
    info!("Saved {} scenario records to {:?}", records.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::scenario::expand;
    use crate::Decile;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        decile: Decile,
        value: f64,
        note: Option<f64>,
    }

    #[test]
    fn test_csv_roundtrip_with_empty_cells() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("rows.csv");
        let rows = vec![
            Row { decile: Decile::new(1).unwrap(), value: 1.5, note: None },
            Row { decile: Decile::new(10).unwrap(), value: 2.0, note: Some(3.0) },
        ];
        write_csv(&path, &rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("decile,value,note"));
        assert!(text.contains("Decile 1,1.5,\n"));

        let back: Vec<Row> = read_csv(&path).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn test_missing_input_reported() {
        let dir = TempDir::new().unwrap();
        let err = read_csv::<Row>(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, UqError::MissingInput(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_absent_scenario_table_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = load_scenarios(dir.path().join("scenarios.json")).unwrap_err();
        assert!(matches!(err, UqError::MissingInput(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_scenarios_saved_and_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scenarios.json");
        let config = SimulationConfig {
            iterations: 2,
            demand_levels_gb: vec![30.0],
            deciles: vec![Decile::new(4).unwrap()],
            ..SimulationConfig::default()
        };
        let mut records = expand(&config, &mut StdRng::seed_from_u64(2)).unwrap();
        records[0].key.channel_bandwidth_mhz = 0.0;
        save_scenarios(&path, &records).unwrap();

        let loaded = load_scenarios(&path).unwrap();
        assert_eq!(loaded.len(), records.len() - 1);
    }
}
