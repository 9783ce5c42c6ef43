//! Flat-file log table
//!
//! The table is a UTF-8, comma-separated file with the ten canonical columns.
//! The header is written once when the file is created (or found empty);
//! later appends only add rows. There is no locking: concurrent appenders
//! from several processes can interleave rows.

use chrono::{Local, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

use crate::models::{format_timestamp, parse_timestamp, LogRecord, LogTable, HEADER};
use crate::storage::{StorageError, StorageResult};

/// A table read from disk together with the moment it was read
#[derive(Debug, Clone, Serialize)]
pub struct LoadedTable {
    pub table: LogTable,
    #[serde(serialize_with = "serialize_loaded_at")]
    pub loaded_at: NaiveDateTime,
}

fn serialize_loaded_at<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format_timestamp(ts))
}

/// File fingerprint used to detect changes between loads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableVersion {
    pub modified: SystemTime,
    pub len: u64,
}

#[derive(Debug, Clone)]
pub struct LogStore {
    path: PathBuf,
}

impl LogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Current modification time and size of the backing file
    pub fn version(&self) -> StorageResult<TableVersion> {
        let metadata = fs::metadata(&self.path).map_err(|e| self.map_open_error(e))?;
        Ok(TableVersion {
            modified: metadata.modified()?,
            len: metadata.len(),
        })
    }

    /// Append records, writing the header first if the table is new.
    ///
    /// Returns the number of rows written. Write errors are surfaced as-is;
    /// nothing is retried.
    pub fn append(&self, records: &[LogRecord]) -> StorageResult<usize> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if needs_header {
            writer.write_record(HEADER)?;
            info!(path = %self.path.display(), "Created log table");
        }
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        debug!(
            path = %self.path.display(),
            rows = records.len(),
            "Appended rows to log table"
        );
        Ok(records.len())
    }

    /// Read the whole table.
    ///
    /// Files with or without the header row are accepted. A header row that
    /// lacks one of the canonical columns is a `SchemaMismatch`.
    pub fn load(&self) -> StorageResult<LoadedTable> {
        let file = File::open(&self.path).map_err(|e| self.map_open_error(e))?;
        let table = read_table(file)?;

        debug!(path = %self.path.display(), rows = table.len(), "Loaded log table");
        Ok(LoadedTable {
            table,
            loaded_at: Local::now().naive_local(),
        })
    }

    /// Load, turning a missing table or a schema mismatch into an empty table
    pub fn load_or_empty(&self) -> StorageResult<LoadedTable> {
        match self.load() {
            Ok(loaded) => Ok(loaded),
            Err(e @ (StorageError::NotFound(_) | StorageError::SchemaMismatch { .. })) => {
                warn!("{e}; continuing with an empty table");
                Ok(LoadedTable {
                    table: LogTable::default(),
                    loaded_at: Local::now().naive_local(),
                })
            }
            Err(e) => Err(e),
        }
    }

    fn map_open_error(&self, error: io::Error) -> StorageError {
        if error.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(self.path.clone())
        } else {
            StorageError::Io(error)
        }
    }
}

/// Serialize any table view with the canonical header
pub fn write_csv<W: Write>(table: &LogTable, writer: W) -> StorageResult<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    writer.write_record(HEADER)?;
    for record in table {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Parse a table from any reader
pub fn read_table<R: Read>(reader: R) -> StorageResult<LogTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut rows = reader.records();
    let first = match rows.next() {
        Some(row) => row?,
        None => return Ok(LogTable::default()),
    };

    let mut records = Vec::new();
    let headers = if is_header_row(&first) {
        check_columns(&first)?;
        first
    } else {
        if first.len() < HEADER.len() {
            return Err(StorageError::SchemaMismatch {
                missing: HEADER[first.len()..].iter().map(|c| c.to_string()).collect(),
            });
        }
        let canonical = StringRecord::from(HEADER.to_vec());
        records.push(parse_row(&first, &canonical)?);
        canonical
    };

    for row in rows {
        let row = row?;
        if row.len() != headers.len() {
            return Err(StorageError::MalformedRow {
                line: line_of(&row),
                reason: format!("expected {} fields, found {}", headers.len(), row.len()),
            });
        }
        records.push(parse_row(&row, &headers)?);
    }

    Ok(LogTable::new(records))
}

/// A leading row whose first field is not a timestamp is taken as a header
fn is_header_row(row: &StringRecord) -> bool {
    row.get(0).and_then(parse_timestamp).is_none()
}

fn check_columns(header: &StringRecord) -> StorageResult<()> {
    let missing: Vec<String> = HEADER
        .iter()
        .copied()
        .filter(|column| !header.iter().any(|field| field == *column))
        .map(|column| column.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(StorageError::SchemaMismatch { missing })
    }
}

fn parse_row(row: &StringRecord, headers: &StringRecord) -> StorageResult<LogRecord> {
    row.deserialize(Some(headers))
        .map_err(|e| StorageError::MalformedRow {
            line: line_of(row),
            reason: e.to_string(),
        })
}

fn line_of(row: &StringRecord) -> u64 {
    row.position().map(|p| p.line()).unwrap_or(0)
}
