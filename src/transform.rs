//! Canonicalization of cell values when base and compare come from different storage families
//!
//! Text based datasets store dates as ISO-8601 strings and decimals as strings, while
//! binary datasets store them as numbers counted from the SAS epoch (1960-01-01). The
//! transformer rewrites text representations into the numeric form so both sides compare.

use crate::model::{ColumnDescriptor, DataType, Row, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rayon::prelude::*;

/// Days between 1960-01-01 and 1970-01-01
pub const SAS_EPOCH_DAY_OFFSET: i64 = 3653;

/// Seconds between 1960-01-01T00:00:00 and 1970-01-01T00:00:00
pub const SAS_EPOCH_SECOND_OFFSET: i64 = 315_619_200;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    MissingAsEmpty,
    SasDatetime,
    SasDate,
    SasTime,
    Decimal,
}

impl Rule {
    fn for_column(column: &ColumnDescriptor) -> Option<Self> {
        if column.target_data_type == Some(DataType::Integer) {
            match column.data_type {
                DataType::Datetime => return Some(Self::SasDatetime),
                DataType::Date => return Some(Self::SasDate),
                DataType::Time => return Some(Self::SasTime),
                _ => {}
            }
        }

        if column.data_type == DataType::Decimal {
            Some(Self::Decimal)
        } else if column.data_type.is_textual() {
            Some(Self::MissingAsEmpty)
        } else {
            None
        }
    }

    fn apply(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (Self::MissingAsEmpty, Value::Null) => Some(Value::String(String::new())),
            (Self::SasDatetime, Value::String(s)) => Some(sas_datetime(s).map(Value::from).unwrap_or(Value::Null)),
            (Self::SasDate, Value::String(s)) => Some(sas_date(s).map(Value::from).unwrap_or(Value::Null)),
            (Self::SasTime, Value::String(s)) => Some(sas_time(s).map(number_value).unwrap_or(Value::Null)),
            (Self::Decimal, Value::String(s)) => Some(
                s.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(number_value)
                    .unwrap_or(Value::Null),
            ),
            _ => None,
        }
    }
}

/// Per-dataset value rewriter, built once per job from one side's columns
#[derive(Debug, Clone)]
pub struct CrossFormatTransformer {
    rules: Vec<Option<Rule>>,
}

impl CrossFormatTransformer {
    pub fn new(columns: &[ColumnDescriptor]) -> Self {
        Self {
            rules: columns.iter().map(Rule::for_column).collect(),
        }
    }

    /// True when no column needs rewriting
    pub fn is_noop(&self) -> bool {
        self.rules.iter().all(Option::is_none)
    }

    /// Rewrite one cell of the column at `index`
    pub fn transform_value(&self, index: usize, value: &Value) -> Value {
        self.rules
            .get(index)
            .copied()
            .flatten()
            .and_then(|rule| rule.apply(value))
            .unwrap_or_else(|| value.clone())
    }

    pub fn transform_row(&self, row: &mut Row) {
        for (index, cell) in row.iter_mut().enumerate() {
            if let Some(rule) = self.rules.get(index).copied().flatten() {
                if let Some(rewritten) = rule.apply(cell) {
                    *cell = rewritten;
                }
            }
        }
    }

    /// Rewrite a block of rows in place
    pub fn transform_rows(&self, rows: &mut [Row]) {
        if self.is_noop() {
            return;
        }
        rows.par_iter_mut().for_each(|row| self.transform_row(row));
    }
}

/// Milliseconds since 1970-01-01T00:00:00 for an ISO-8601 timestamp, naive times taken as UTC
fn parse_timestamp_millis(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Seconds since 1960-01-01T00:00:00, rounded to the nearest second
pub fn sas_datetime(s: &str) -> Option<i64> {
    let millis = parse_timestamp_millis(s)?;
    Some((millis as f64 / 1000.0).round() as i64 + SAS_EPOCH_SECOND_OFFSET)
}

/// Days since 1960-01-01
pub fn sas_date(s: &str) -> Option<i64> {
    let days_since_1970 = parse_timestamp_millis(s)?.div_euclid(86_400_000);
    Some(days_since_1970 + SAS_EPOCH_DAY_OFFSET)
}

/// Seconds since midnight for `HH:MM:SS`
pub fn sas_time(s: &str) -> Option<f64> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    let mut numbers = [0.0f64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        *slot = part.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
    }
    Some(numbers[0] * 3600.0 + numbers[1] * 60.0 + numbers[2])
}

/// Integral floats become integer JSON numbers so they print without a trailing `.0`
fn number_value(v: f64) -> Value {
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Value::from(v as i64)
    } else {
        serde_json::Number::from_f64(v)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
