//! Export of aggregated records.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ExportError;
use crate::models::record::{ReceiptRecord, FIELD_NAMES};

/// Prefix of timestamped export file names.
pub const EXPORT_FILE_PREFIX: &str = "receipt_data";

/// Export file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Pretty-printed JSON array.
    #[default]
    Json,
    /// One header row plus one row per record.
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Serialize records as a UTF-8 JSON array with two-space indentation.
pub fn to_json(records: &[ReceiptRecord]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Read records back from an exported JSON array.
pub fn from_json(text: &str) -> Result<Vec<ReceiptRecord>, ExportError> {
    Ok(serde_json::from_str(text)?)
}

/// Serialize records as CSV with the record keys as header.
pub fn to_csv(records: &[ReceiptRecord]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(FIELD_NAMES)?;
    for record in records {
        wtr.write_record(record.values())?;
    }

    let data = wtr.into_inner().map_err(|e| ExportError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

/// Render records in the given format.
pub fn render(records: &[ReceiptRecord], format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Json => to_json(records),
        ExportFormat::Csv => to_csv(records),
    }
}

/// File name for an export made at `timestamp`, e.g. `receipt_data_20250101_093000.json`.
pub fn export_file_name<Tz>(format: ExportFormat, timestamp: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!(
        "{}_{}.{}",
        EXPORT_FILE_PREFIX,
        timestamp.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

/// Write a timestamped export file into `dir` and return its path.
pub fn write_export<Tz>(
    dir: &Path,
    records: &[ReceiptRecord],
    format: ExportFormat,
    timestamp: &DateTime<Tz>,
) -> Result<PathBuf, ExportError>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let content = render(records, format)?;
    let path = dir.join(export_file_name(format, timestamp));

    std::fs::write(&path, content).map_err(|source| ExportError::Write {
        path: path.display().to_string(),
        source,
    })?;

    debug!("Wrote {} records to {}", records.len(), path.display());
    Ok(path)
}
