//! Writes fetched results to disk as JSON or CSV.
use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use log::info;
use serde_json::Value;
use thiserror::Error;

use crate::{
    fetch::EntityType,
    protocol::{Record, Stats},
};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export IO error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to write csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record {row} has field '{key}' missing from the csv header")]
    UnexpectedField { row: usize, key: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Csv,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Csv => "csv",
        }
    }
}

pub fn stats_path(dir: &Path, format: Format) -> PathBuf {
    dir.join(format!("dbstats.{}", format.extension()))
}

pub fn records_path(dir: &Path, entity: EntityType, flags: &str, format: Format) -> PathBuf {
    dir.join(format!("{entity}_{flags}.{}", format.extension()))
}

/// Writes `stats` into `dir`, creating it when missing.
pub fn export_stats(dir: &Path, stats: &Stats, format: Format) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir)?;
    let path = stats_path(dir, format);
    let mut writer = BufWriter::new(File::create(&path)?);
    write_stats(stats, format, &mut writer)?;
    writer.flush()?;

    info!("wrote {}", path.display());
    Ok(path)
}

/// Writes `records` into `dir`, creating it when missing.
pub fn export_records(
    dir: &Path,
    entity: EntityType,
    flags: &str,
    records: &[Record],
    format: Format,
) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir)?;
    let path = records_path(dir, entity, flags, format);
    let mut writer = BufWriter::new(File::create(&path)?);
    write_records(records, format, &mut writer)?;
    writer.flush()?;

    info!("wrote {} records to {}", records.len(), path.display());
    Ok(path)
}

/// A single header row of table names and a single row of totals in CSV.
pub fn write_stats<W: Write>(stats: &Stats, format: Format, writer: W) -> Result<(), ExportError> {
    match format {
        Format::Json => serde_json::to_writer(writer, stats)?,
        Format::Csv => {
            let mut csv = csv::Writer::from_writer(writer);
            csv.write_record(stats.as_map().keys())?;
            csv.write_record(stats.as_map().values().map(cell))?;
            csv.flush()?;
        }
    }
    Ok(())
}

/// CSV columns follow the keys of the first record, in the order received.
/// A later record carrying a key outside that header fails the export.
pub fn write_records<W: Write>(
    records: &[Record],
    format: Format,
    writer: W,
) -> Result<(), ExportError> {
    match format {
        Format::Json => serde_json::to_writer(writer, records)?,
        Format::Csv => {
            let Some(first) = records.first() else {
                return Ok(());
            };
            let header: Vec<&String> = first.keys().collect();

            let mut csv = csv::Writer::from_writer(writer);
            csv.write_record(&header)?;
            for (row, record) in records.iter().enumerate() {
                if let Some(key) = record.keys().find(|key| !first.contains_key(key.as_str())) {
                    return Err(ExportError::UnexpectedField {
                        row,
                        key: key.clone(),
                    });
                }
                let fields = header
                    .iter()
                    .map(|key| record.get(key.as_str()).map(cell).unwrap_or_default());
                csv.write_record(fields)?;
            }
            csv.flush()?;
        }
    }
    Ok(())
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
