//! Dataset providers: the only place the engine touches stored data

use crate::error::{DiffError, Result};
use crate::model::{ColumnDescriptor, DatasetHandle, DatasetMetadata, Row};
use serde::Deserialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::sync::{Arc, Mutex};

/// Source of schemas and row windows for dataset handles
pub trait DatasetProvider: Send + Sync {
    /// Schema and record count of a dataset
    fn metadata(&self, handle: &DatasetHandle) -> Result<DatasetMetadata>;

    /// At most `length` rows starting at the 0-based row `start`
    fn rows(&self, handle: &DatasetHandle, start: u64, length: usize, filter: Option<&str>) -> Result<Vec<Row>>;

    /// Whether `rows` can evaluate a filter expression for this handle
    fn supports_filter(&self, _handle: &DatasetHandle) -> bool {
        false
    }

    /// Drop any state held for a dataset once a job is done with it
    fn release(&self, _handle: &DatasetHandle) {}
}

impl<P: DatasetProvider + ?Sized> DatasetProvider for Arc<P> {
    fn metadata(&self, handle: &DatasetHandle) -> Result<DatasetMetadata> {
        (**self).metadata(handle)
    }

    fn rows(&self, handle: &DatasetHandle, start: u64, length: usize, filter: Option<&str>) -> Result<Vec<Row>> {
        (**self).rows(handle, start, length, filter)
    }

    fn supports_filter(&self, handle: &DatasetHandle) -> bool {
        (**self).supports_filter(handle)
    }

    fn release(&self, handle: &DatasetHandle) {
        (**self).release(handle)
    }
}

fn window(rows: &[Row], start: u64, length: usize) -> Vec<Row> {
    let start = usize::try_from(start).unwrap_or(usize::MAX).min(rows.len());
    let end = start.saturating_add(length).min(rows.len());
    rows[start..end].to_vec()
}

/// Datasets held in memory, keyed by handle location
#[derive(Debug, Default)]
pub struct MemoryProvider {
    datasets: HashMap<String, (DatasetMetadata, Vec<Row>)>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dataset; its record count is taken from `rows`
    pub fn insert(&mut self, location: impl Into<String>, mut metadata: DatasetMetadata, rows: Vec<Row>) {
        metadata.records = rows.len() as u64;
        self.datasets.insert(location.into(), (metadata, rows));
    }

    fn get(&self, handle: &DatasetHandle) -> Result<&(DatasetMetadata, Vec<Row>)> {
        self.datasets
            .get(&handle.location)
            .ok_or_else(|| DiffError::access(&handle.location, "no such dataset"))
    }
}

impl DatasetProvider for MemoryProvider {
    fn metadata(&self, handle: &DatasetHandle) -> Result<DatasetMetadata> {
        Ok(self.get(handle)?.0.clone())
    }

    fn rows(&self, handle: &DatasetHandle, start: u64, length: usize, _filter: Option<&str>) -> Result<Vec<Row>> {
        Ok(window(&self.get(handle)?.1, start, length))
    }
}

/// Dataset-JSON header fields shared by the JSON and NDJSON layouts
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetJsonHeader {
    #[serde(default)]
    name: String,
    #[serde(default)]
    label: String,
    records: Option<u64>,
    columns: Vec<ColumnDescriptor>,
}

#[derive(Debug, Deserialize)]
struct DatasetJsonDocument {
    #[serde(flatten)]
    header: DatasetJsonHeader,
    #[serde(default)]
    rows: Vec<Row>,
}

impl DatasetJsonHeader {
    fn into_metadata(self, counted: u64) -> DatasetMetadata {
        DatasetMetadata {
            name: self.name,
            label: self.label,
            records: self.records.unwrap_or(counted),
            columns: self.columns,
        }
    }
}

/// Open NDJSON reader positioned before data row `next_row` (0-based)
#[derive(Debug)]
struct NdjsonCursor {
    lines: Lines<BufReader<File>>,
    next_row: u64,
}

impl NdjsonCursor {
    fn open(handle: &DatasetHandle) -> Result<Self> {
        let mut lines = BufReader::new(DatasetJsonProvider::open(handle)?).lines();
        // Header line
        lines
            .next()
            .transpose()
            .map_err(|e| DiffError::access(&handle.location, e.to_string()))?;
        Ok(Self { lines, next_row: 0 })
    }

    fn next_data_line(&mut self) -> Option<std::io::Result<String>> {
        loop {
            match self.lines.next()? {
                Ok(line) if line.trim().is_empty() => continue,
                other => return Some(other),
            }
        }
    }

    fn read(&mut self, handle: &DatasetHandle, start: u64, length: usize) -> Result<Vec<Row>> {
        while self.next_row < start {
            match self.next_data_line() {
                Some(line) => {
                    line.map_err(|e| DiffError::access(&handle.location, e.to_string()))?;
                    self.next_row += 1;
                }
                None => return Ok(Vec::new()),
            }
        }

        let mut rows = Vec::with_capacity(length);
        while rows.len() < length {
            let Some(line) = self.next_data_line() else {
                break;
            };
            let line = line.map_err(|e| DiffError::access(&handle.location, e.to_string()))?;
            let row: Row = serde_json::from_str(&line).map_err(|e| {
                DiffError::access(&handle.location, format!("malformed row {}: {}", self.next_row + 1, e))
            })?;
            self.next_row += 1;
            rows.push(row);
        }
        Ok(rows)
    }
}

/// CDISC Dataset-JSON files: `.json` documents and `.ndjson` streams.
/// Parsed documents and open NDJSON readers are kept until `release`.
#[derive(Debug, Default)]
pub struct DatasetJsonProvider {
    documents: Mutex<HashMap<String, Arc<(DatasetMetadata, Vec<Row>)>>>,
    cursors: Mutex<HashMap<String, NdjsonCursor>>,
}

impl DatasetJsonProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_ndjson(handle: &DatasetHandle) -> bool {
        handle.extension().as_deref() == Some("ndjson")
    }

    fn open(handle: &DatasetHandle) -> Result<File> {
        File::open(&handle.location).map_err(|e| DiffError::access(&handle.location, e.to_string()))
    }

    /// Whole `.json` documents are parsed once and kept for later windows
    fn document(&self, handle: &DatasetHandle) -> Result<Arc<(DatasetMetadata, Vec<Row>)>> {
        let mut documents = self
            .documents
            .lock()
            .map_err(|_| DiffError::access(&handle.location, "document cache poisoned"))?;
        if let Some(doc) = documents.get(&handle.location) {
            return Ok(Arc::clone(doc));
        }

        log::debug!("Parsing Dataset-JSON document {}", handle.location);
        let reader = BufReader::new(Self::open(handle)?);
        let doc: DatasetJsonDocument = serde_json::from_reader(reader)
            .map_err(|e| DiffError::access(&handle.location, format!("malformed Dataset-JSON: {}", e)))?;
        let metadata = doc.header.into_metadata(doc.rows.len() as u64);
        let entry = Arc::new((metadata, doc.rows));
        documents.insert(handle.location.clone(), Arc::clone(&entry));
        Ok(entry)
    }

    fn ndjson_metadata(handle: &DatasetHandle) -> Result<DatasetMetadata> {
        let mut lines = BufReader::new(Self::open(handle)?).lines();
        let first = lines
            .next()
            .ok_or_else(|| DiffError::access(&handle.location, "empty NDJSON file"))?
            .map_err(|e| DiffError::access(&handle.location, e.to_string()))?;
        let header: DatasetJsonHeader = serde_json::from_str(&first)
            .map_err(|e| DiffError::access(&handle.location, format!("malformed NDJSON header: {}", e)))?;

        let counted = match header.records {
            Some(records) => records,
            None => lines.filter(|l| l.as_ref().map_or(true, |l| !l.trim().is_empty())).count() as u64,
        };
        Ok(header.into_metadata(counted))
    }

    /// Sequential windows continue from the open reader; a window before it reopens the file
    fn ndjson_rows(&self, handle: &DatasetHandle, start: u64, length: usize) -> Result<Vec<Row>> {
        let mut cursors = self
            .cursors
            .lock()
            .map_err(|_| DiffError::access(&handle.location, "NDJSON reader cache poisoned"))?;
        let cursor = match cursors.entry(handle.location.clone()) {
            Entry::Occupied(entry) if entry.get().next_row <= start => entry.into_mut(),
            Entry::Occupied(mut entry) => {
                log::debug!("Rewinding NDJSON reader for {} to row {}", handle.location, start + 1);
                entry.insert(NdjsonCursor::open(handle)?);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(NdjsonCursor::open(handle)?),
        };
        cursor.read(handle, start, length)
    }

    /// Number of datasets with a cached document or an open reader
    pub fn cached_datasets(&self) -> usize {
        let documents = self.documents.lock().map_or(0, |d| d.len());
        let cursors = self.cursors.lock().map_or(0, |c| c.len());
        documents + cursors
    }
}

impl DatasetProvider for DatasetJsonProvider {
    fn metadata(&self, handle: &DatasetHandle) -> Result<DatasetMetadata> {
        if Self::is_ndjson(handle) {
            Self::ndjson_metadata(handle)
        } else {
            Ok(self.document(handle)?.0.clone())
        }
    }

    fn rows(&self, handle: &DatasetHandle, start: u64, length: usize, _filter: Option<&str>) -> Result<Vec<Row>> {
        if Self::is_ndjson(handle) {
            self.ndjson_rows(handle, start, length)
        } else {
            Ok(window(&self.document(handle)?.1, start, length))
        }
    }

    fn release(&self, handle: &DatasetHandle) {
        if let Ok(mut documents) = self.documents.lock() {
            documents.remove(&handle.location);
        }
        if let Ok(mut cursors) = self.cursors.lock() {
            cursors.remove(&handle.location);
        }
    }
}

/// Picks a provider from the handle's file extension
#[derive(Debug, Default)]
pub struct FileProvider {
    json: DatasetJsonProvider,
    #[cfg(feature = "duckdb")]
    duckdb: crate::duckdb_provider::DuckDbProvider,
}

impl FileProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn route(&self, handle: &DatasetHandle) -> Result<&dyn DatasetProvider> {
        match handle.extension().as_deref() {
            Some("json") | Some("ndjson") => Ok(&self.json),
            #[cfg(feature = "duckdb")]
            Some("csv") | Some("parquet") => Ok(&self.duckdb),
            other => Err(DiffError::access(
                &handle.location,
                format!("unsupported dataset format: {}", other.unwrap_or("<none>")),
            )),
        }
    }
}

impl DatasetProvider for FileProvider {
    fn metadata(&self, handle: &DatasetHandle) -> Result<DatasetMetadata> {
        self.route(handle)?.metadata(handle)
    }

    fn rows(&self, handle: &DatasetHandle, start: u64, length: usize, filter: Option<&str>) -> Result<Vec<Row>> {
        self.route(handle)?.rows(handle, start, length, filter)
    }

    fn supports_filter(&self, handle: &DatasetHandle) -> bool {
        self.route(handle).map_or(false, |p| p.supports_filter(handle))
    }

    fn release(&self, handle: &DatasetHandle) {
        if let Ok(provider) = self.route(handle) {
            provider.release(handle);
        }
    }
}
