//! Common test utilities and helpers

use dsdiff::{ColumnDescriptor, DataType, DatasetMetadata, MemoryProvider, Result, Row};
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary directory for dataset files written during a test
pub struct TestFixture {
    pub temp_dir: TempDir,
}

impl TestFixture {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a Dataset-JSON document with the given schema and rows
    pub fn create_dataset_json(&self, file: &str, name: &str, columns: &[ColumnDescriptor], rows: &[Row]) -> Result<PathBuf> {
        let path = self.root().join(file);
        let doc = json!({
            "datasetJSONVersion": "1.1.0",
            "name": name,
            "label": "",
            "records": rows.len(),
            "columns": columns,
            "rows": rows,
        });
        fs::write(&path, serde_json::to_string_pretty(&doc)?)?;
        Ok(path)
    }

    /// Write an NDJSON dataset: a header line followed by one row per line
    pub fn create_ndjson(&self, file: &str, name: &str, columns: &[ColumnDescriptor], rows: &[Row]) -> Result<PathBuf> {
        let path = self.root().join(file);
        let mut out = fs::File::create(&path)?;
        let header = json!({
            "name": name,
            "records": rows.len(),
            "columns": columns,
        });
        writeln!(out, "{}", header)?;
        for row in rows {
            writeln!(out, "{}", serde_json::to_string(row)?)?;
        }
        Ok(path)
    }

    /// Write raw text content
    pub fn create_raw(&self, file: &str, content: &str) -> Result<PathBuf> {
        let path = self.root().join(file);
        fs::write(&path, content)?;
        Ok(path)
    }
}

/// Schema built from (name, type) pairs
pub fn metadata(name: &str, columns: &[(&str, DataType)]) -> DatasetMetadata {
    DatasetMetadata {
        name: name.to_string(),
        label: String::new(),
        records: 0,
        columns: columns
            .iter()
            .map(|(col, data_type)| ColumnDescriptor::new(*col, *data_type))
            .collect(),
    }
}

/// In-memory provider holding a `base` and a `compare` dataset
pub fn provider_pair(base: (DatasetMetadata, Vec<Row>), compare: (DatasetMetadata, Vec<Row>)) -> MemoryProvider {
    let mut provider = MemoryProvider::new();
    provider.insert("base", base.0, base.1);
    provider.insert("compare", compare.0, compare.1);
    provider
}

/// Sample data generators
pub mod sample_data {
    use super::*;

    /// Demographics-like rows: USUBJID, AGE, SEX
    pub fn demographics(count: usize) -> Vec<Row> {
        (0..count)
            .map(|i| {
                vec![
                    json!(format!("SUBJ-{:04}", i + 1)),
                    json!(20 + (i % 50) as i64),
                    json!(if i % 2 == 0 { "F" } else { "M" }),
                ]
            })
            .collect()
    }

    pub fn demographics_columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("USUBJID", DataType::String).with_label("Unique Subject Identifier"),
            ColumnDescriptor::new("AGE", DataType::Integer).with_label("Age"),
            ColumnDescriptor::new("SEX", DataType::String).with_label("Sex"),
        ]
    }

    pub fn demographics_metadata() -> DatasetMetadata {
        DatasetMetadata {
            name: "DM".to_string(),
            label: "Demographics".to_string(),
            records: 0,
            columns: demographics_columns(),
        }
    }
}
