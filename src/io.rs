//! Reading and writing the sensor table.
//!
//! The table is comma delimited with a header row. Columns are matched by
//! exact, case-sensitive name and any extra columns are ignored. An empty
//! `SOIL_PCT` field or a NaN one is a missing target; an empty or non-finite
//! feature field is rejected.

use log::{debug, info};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::dataset::Dataset;
use crate::error::{PipelineError, Result};
use crate::record::{Feature, Record, TARGET_COLUMN};

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "PH")]
    ph: Option<f64>,
    #[serde(rename = "NPK_N")]
    npk_n: Option<f64>,
    #[serde(rename = "NPK_P")]
    npk_p: Option<f64>,
    #[serde(rename = "NPK_K")]
    npk_k: Option<f64>,
    #[serde(rename = "LDR_MV")]
    ldr_mv: Option<f64>,
    #[serde(rename = "SOIL_PCT")]
    soil_pct: Option<f64>,
}

impl RawRecord {
    fn into_record(self, source: &str, line: usize) -> Result<Record> {
        let required = |value: Option<f64>, feature: Feature| match value {
            Some(v) if v.is_finite() => Ok(v),
            Some(v) => Err(PipelineError::data_load(
                source,
                format!("line {line}: non-finite value {v} in column {feature}"),
            )),
            None => Err(PipelineError::data_load(
                source,
                format!("line {line}: missing value in column {feature}"),
            )),
        };

        // NaN is how exported tables spell a missing target
        let soil_pct = match self.soil_pct {
            Some(v) if v.is_nan() => None,
            Some(v) if v.is_infinite() => {
                return Err(PipelineError::data_load(
                    source,
                    format!("line {line}: non-finite value {v} in column {TARGET_COLUMN}"),
                ));
            }
            other => other,
        };

        Ok(Record::new(
            required(self.ph, Feature::Ph)?,
            required(self.npk_n, Feature::NpkN)?,
            required(self.npk_p, Feature::NpkP)?,
            required(self.npk_k, Feature::NpkK)?,
            required(self.ldr_mv, Feature::LdrMv)?,
            soil_pct,
        ))
    }
}

/// Loads the sensor table at `path`.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let path = path.as_ref();
    let source = path.display().to_string();
    let file = File::open(path).map_err(|e| PipelineError::data_load(&source, e))?;
    let dataset = read_records(file, &source)?;
    info!("loaded {} rows from {source}", dataset.n_samples());
    Ok(dataset)
}

/// Loads the sensor table from any reader, e.g. an in-memory buffer.
pub fn load_from_reader<R: Read>(reader: R) -> Result<Dataset> {
    read_records(reader, "<reader>")
}

fn read_records<R: Read>(reader: R, source: &str) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::data_load(source, format!("failed to read header: {e}")))?
        .clone();

    let missing: Vec<&str> = Feature::ALL
        .iter()
        .map(|f| f.column())
        .chain(std::iter::once(TARGET_COLUMN))
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::data_load(
            source,
            format!("missing required columns: {}", missing.join(", ")),
        ));
    }

    let mut records = Vec::new();
    for (i, row) in reader.deserialize::<RawRecord>().enumerate() {
        // header is line 1
        let line = i + 2;
        let raw = row.map_err(|e| PipelineError::data_load(source, format!("line {line}: {e}")))?;
        records.push(raw.into_record(source, line)?);
    }

    Ok(Dataset::new(records))
}

/// Writes records with the same header layout [`load`] expects, so the file
/// can be handed to the next stage.
pub fn write_csv<P: AsRef<Path>>(dataset: &Dataset, path: P) -> Result<()> {
    let path = path.as_ref();
    let source = path.display().to_string();
    let file = File::create(path).map_err(|e| PipelineError::data_load(&source, e))?;
    write_records(dataset, file, &source)?;
    info!("wrote {} rows to {source}", dataset.n_samples());
    Ok(())
}

fn write_records<W: Write>(dataset: &Dataset, writer: W, source: &str) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for record in dataset.records() {
        writer
            .serialize(record)
            .map_err(|e| PipelineError::data_load(source, e))?;
    }
    writer.flush().map_err(|e| PipelineError::data_load(source, e))?;
    Ok(())
}

/// Memoizes loaded datasets by canonical file path. Entries stay until
/// they are invalidated; the file is not watched for changes.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<PathBuf, Dataset>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load<P: AsRef<Path>>(&mut self, path: P) -> Result<&Dataset> {
        let key = Self::key(path.as_ref())?;
        if !self.entries.contains_key(&key) {
            let dataset = load(&key)?;
            self.entries.insert(key.clone(), dataset);
        } else {
            debug!("cache hit for {}", key.display());
        }
        self.entries
            .get(&key)
            .ok_or_else(|| PipelineError::data_load(key.display(), "cache entry vanished"))
    }

    /// Forgets the entry for `path`. Returns whether one existed.
    pub fn invalidate<P: AsRef<Path>>(&mut self, path: P) -> bool {
        match Self::key(path.as_ref()) {
            Ok(key) => self.entries.remove(&key).is_some(),
            Err(_) => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key(path: &Path) -> Result<PathBuf> {
        fs::canonicalize(path).map_err(|e| PipelineError::data_load(path.display(), e))
    }
}
