//! Bucket inventory records and their TSV representation.
//!
//! The inventory file has no header; each line is a
//! `bucket<TAB>key<TAB>modified` triplet.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One object listed from a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub bucket: String,
    pub key: String,
    pub modified: DateTime<Utc>,
}

impl InventoryEntry {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, modified: DateTime<Utc>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            modified,
        }
    }
}

/// Parses the timestamp formats seen in bucket listings.
///
/// Accepts RFC 3339 (`2024-01-02T03:04:05+00:00`), the space-separated form
/// with an offset, and a naive `YYYY-MM-DD HH:MM:SS` taken as UTC.
pub fn parse_modified(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(ValidationError::InvalidTimestamp(raw.to_string()))
}

pub fn format_modified(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Reads a headerless tab-separated inventory file.
pub fn read_inventory(path: &Path) -> Result<Vec<InventoryEntry>, ValidationError> {
    if !path.exists() {
        return Err(ValidationError::MissingFile(path.display().to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let file = path.display().to_string();
    let mut entries = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() != 3 {
            return Err(ValidationError::InvalidRow {
                file,
                row: idx + 1,
                reason: format!("expected 3 tab-separated fields, found {}", record.len()),
            });
        }
        entries.push(InventoryEntry {
            bucket: record[0].to_string(),
            key: record[1].to_string(),
            modified: parse_modified(&record[2])?,
        });
    }
    Ok(entries)
}

/// Writes inventory triplets to any writer.
pub fn write_inventory_to<W: Write>(
    writer: W,
    entries: &[InventoryEntry],
) -> Result<(), ValidationError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer);
    for entry in entries {
        writer.write_record([
            entry.bucket.as_str(),
            entry.key.as_str(),
            format_modified(&entry.modified).as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes inventory triplets to `path`, creating parent directories.
pub fn write_inventory(path: &Path, entries: &[InventoryEntry]) -> Result<(), ValidationError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_inventory_to(file, entries)
}
