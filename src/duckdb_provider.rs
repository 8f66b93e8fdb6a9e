//! CSV and Parquet datasets read through DuckDB

use crate::error::{DiffError, Result};
use crate::model::{ColumnDescriptor, DatasetHandle, DatasetMetadata, Row, StorageFamily, Value};
use crate::provider::DatasetProvider;
use crate::transform::{SAS_EPOCH_DAY_OFFSET, SAS_EPOCH_SECOND_OFFSET};
use duckdb::types::{TimeUnit, ValueRef};
use duckdb::Connection;
use std::path::Path;
use std::sync::Mutex;

/// Reads row windows with `LIMIT/OFFSET` from an in-memory DuckDB connection
#[derive(Debug, Default)]
pub struct DuckDbProvider {
    connection: Mutex<Option<Connection>>,
}

impl DuckDbProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_connection<T>(&self, handle: &DatasetHandle, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| DiffError::access(&handle.location, "DuckDB connection poisoned"))?;
        if guard.is_none() {
            let connection = Connection::open_in_memory()?;
            connection.execute("SET enable_progress_bar=false", [])?;
            *guard = Some(connection);
        }
        match guard.as_ref() {
            Some(connection) => f(connection),
            None => Err(DiffError::access(&handle.location, "DuckDB connection unavailable")),
        }
    }

    fn source(handle: &DatasetHandle) -> Result<String> {
        if !Path::new(&handle.location).is_file() {
            return Err(DiffError::access(&handle.location, "file not found"));
        }
        Ok(format!("'{}'", handle.location.replace('\'', "''")))
    }

    fn describe(connection: &Connection, handle: &DatasetHandle, source: &str) -> Result<Vec<ColumnDescriptor>> {
        let mut stmt = connection
            .prepare(&format!("DESCRIBE SELECT * FROM {}", source))
            .map_err(|e| convert_duckdb_error(e, handle))?;
        let columns = stmt
            .query_map([], |row| {
                let name: String = row.get(0)?;
                let column_type: String = row.get(1)?;
                Ok(ColumnDescriptor::from_sql(name, &column_type))
            })
            .map_err(|e| convert_duckdb_error(e, handle))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| convert_duckdb_error(e, handle))?;
        Ok(columns)
    }
}

impl DatasetProvider for DuckDbProvider {
    fn metadata(&self, handle: &DatasetHandle) -> Result<DatasetMetadata> {
        let source = Self::source(handle)?;
        self.with_connection(handle, |connection| {
            let columns = Self::describe(connection, handle, &source)?;
            let records: u64 = connection
                .query_row(&format!("SELECT COUNT(*) FROM {}", source), [], |row| row.get(0))
                .map_err(|e| convert_duckdb_error(e, handle))?;
            let name = Path::new(&handle.location)
                .file_stem()
                .map(|s| s.to_string_lossy().to_uppercase())
                .unwrap_or_default();

            Ok(DatasetMetadata {
                name,
                label: String::new(),
                records,
                columns,
            })
        })
    }

    fn rows(&self, handle: &DatasetHandle, start: u64, length: usize, filter: Option<&str>) -> Result<Vec<Row>> {
        let source = Self::source(handle)?;
        let binary = handle.family == StorageFamily::Binary;
        self.with_connection(handle, |connection| {
            let column_count = Self::describe(connection, handle, &source)?.len();
            let where_clause = filter.map(|f| format!(" WHERE {}", f)).unwrap_or_default();
            let sql = format!(
                "SELECT * FROM {}{} LIMIT {} OFFSET {}",
                source, where_clause, length, start
            );

            let mut stmt = connection.prepare(&sql).map_err(|e| convert_duckdb_error(e, handle))?;
            let rows = stmt
                .query_map([], |row| {
                    let mut cells = Vec::with_capacity(column_count);
                    for i in 0..column_count {
                        cells.push(convert_value(row.get_ref(i)?, binary));
                    }
                    Ok(cells)
                })
                .map_err(|e| convert_duckdb_error(e, handle))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| convert_duckdb_error(e, handle))?;
            Ok(rows)
        })
    }

    fn supports_filter(&self, _handle: &DatasetHandle) -> bool {
        true
    }
}

/// Map DuckDB errors to access errors with a readable cause
fn convert_duckdb_error(error: duckdb::Error, handle: &DatasetHandle) -> DiffError {
    let message = error.to_string();
    let cause = if message.contains("CSV Error") || message.contains("Could not convert") {
        format!("malformed CSV: {}", message)
    } else if message.contains("No files found") || message.contains("does not exist") {
        "file not found".to_string()
    } else if message.contains("Permission denied") {
        "permission denied".to_string()
    } else {
        message
    };
    DiffError::access(&handle.location, cause)
}

fn micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value * 1_000_000,
        TimeUnit::Millisecond => value * 1_000,
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

/// Seconds since 1960-01-01, rounded to the nearest second like text timestamps
fn sas_seconds(micros: i64) -> i64 {
    (micros as f64 / 1_000_000.0).round() as i64 + SAS_EPOCH_SECOND_OFFSET
}

fn float(v: f64) -> Value {
    serde_json::Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

/// Binary files expose temporal values as SAS epoch numbers, text files as ISO strings
fn convert_value(value: ValueRef<'_>, binary: bool) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::from(b),
        ValueRef::TinyInt(i) => Value::from(i),
        ValueRef::SmallInt(i) => Value::from(i),
        ValueRef::Int(i) => Value::from(i),
        ValueRef::BigInt(i) => Value::from(i),
        ValueRef::HugeInt(i) => i64::try_from(i).map(Value::from).unwrap_or_else(|_| Value::from(i.to_string())),
        ValueRef::UTinyInt(i) => Value::from(i),
        ValueRef::USmallInt(i) => Value::from(i),
        ValueRef::UInt(i) => Value::from(i),
        ValueRef::UBigInt(i) => Value::from(i),
        ValueRef::Float(f) => float(f as f64),
        ValueRef::Double(f) => float(f),
        ValueRef::Decimal(d) => d.to_string().parse::<f64>().map(float).unwrap_or(Value::Null),
        ValueRef::Text(s) => Value::from(String::from_utf8_lossy(s).into_owned()),
        ValueRef::Date32(days) if binary => Value::from(days as i64 + SAS_EPOCH_DAY_OFFSET),
        ValueRef::Date32(days) => chrono::NaiveDate::from_num_days_from_ce_opt(days + 719_163)
            .map(|d| Value::from(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),
        ValueRef::Timestamp(unit, v) if binary => {
            Value::from(sas_seconds(micros(unit, v)))
        }
        ValueRef::Timestamp(unit, v) => chrono::DateTime::from_timestamp_micros(micros(unit, v))
            .map(|dt| Value::from(dt.naive_utc().format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            .unwrap_or(Value::Null),
        ValueRef::Time64(unit, v) if binary => Value::from(micros(unit, v) / 1_000_000),
        ValueRef::Time64(unit, v) => {
            let secs = micros(unit, v) / 1_000_000;
            Value::from(format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60))
        }
        other => Value::from(format!("{:?}", other)),
    }
}
