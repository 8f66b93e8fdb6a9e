//! Dataset schema and row types shared by every diff stage

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A single cell value: string, number, boolean or null
pub type Value = serde_json::Value;

/// Cells in the column order of the dataset they were read from
pub type Row = Vec<Value>;

/// Semantic type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Integer,
    Float,
    Double,
    Decimal,
    Date,
    Datetime,
    Time,
    Boolean,
}

impl DataType {
    /// Map a SQL column type name such as `BIGINT` or `DECIMAL(10,2)`
    pub fn from_sql_type(column_type: &str) -> Self {
        let upper = column_type.trim().to_ascii_uppercase();
        match upper.as_str() {
            "BOOLEAN" => Self::Boolean,
            "TINYINT" | "SMALLINT" | "INTEGER" | "BIGINT" | "HUGEINT" | "UTINYINT" | "USMALLINT" | "UINTEGER"
            | "UBIGINT" => Self::Integer,
            "FLOAT" | "REAL" => Self::Float,
            "DOUBLE" => Self::Double,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            t if t.starts_with("DECIMAL") => Self::Decimal,
            t if t.starts_with("TIMESTAMP") => Self::Datetime,
            _ => Self::String,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Time => "time",
            Self::Boolean => "boolean",
        }
    }

    /// Types compared with a numeric tolerance
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float | Self::Double | Self::Decimal)
    }

    /// Types whose missing value is written differently across storage families
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::String | Self::Date | Self::Datetime | Self::Time)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::Datetime | Self::Time)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schema entry for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(default)]
    pub label: String,
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_data_type: Option<DataType>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            label: String::new(),
            data_type,
            length: None,
            display_format: None,
            target_data_type: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_display_format(mut self, format: impl Into<String>) -> Self {
        self.display_format = Some(format.into());
        self
    }

    pub fn with_target_data_type(mut self, target: DataType) -> Self {
        self.target_data_type = Some(target);
        self
    }

    /// Descriptor for a column read through SQL. Temporal columns are stored
    /// as SAS-epoch integers in binary files, so they carry an integer target.
    pub fn from_sql(name: impl Into<String>, column_type: &str) -> Self {
        let data_type = DataType::from_sql_type(column_type);
        let column = Self::new(name, data_type);
        if data_type.is_temporal() {
            column.with_target_data_type(DataType::Integer)
        } else {
            column
        }
    }
}

/// Schema of one dataset, fixed for the lifetime of a comparison job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    pub name: String,
    #[serde(default)]
    pub label: String,
    pub records: u64,
    pub columns: Vec<ColumnDescriptor>,
}

impl DatasetMetadata {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Storage family a dataset was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageFamily {
    /// Binary or columnar files (SAS transport, sas7bdat, Parquet)
    Binary,
    /// Text based files (Dataset-JSON, NDJSON, CSV)
    Text,
    Unknown,
}

impl StorageFamily {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "xpt" | "sas7bdat" | "parquet" => Self::Binary,
            "json" | "ndjson" | "csv" => Self::Text,
            _ => Self::Unknown,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// True when both families are known and differ
    pub fn is_cross_family(base: Self, compare: Self) -> bool {
        base != Self::Unknown && compare != Self::Unknown && base != compare
    }
}

/// Opaque reference to a dataset understood by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetHandle {
    pub location: String,
    pub family: StorageFamily,
}

impl DatasetHandle {
    /// Create a handle whose storage family is inferred from the extension
    pub fn new(location: impl Into<String>) -> Self {
        let location = location.into();
        let family = StorageFamily::from_path(&location);
        Self { location, family }
    }

    pub fn with_family(mut self, family: StorageFamily) -> Self {
        self.family = family;
        self
    }

    pub fn extension(&self) -> Option<String> {
        Path::new(&self.location)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}

impl fmt::Display for DatasetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location)
    }
}
