//! # dsdiff
//!
//! A streaming diff engine for large tabular datasets. Compares the schemas of two
//! datasets and their content block by block, with numeric tolerance, key-based row
//! matching, cross-format value canonicalization, and diff-count circuit breakers.

pub mod accumulator;
pub mod cli;
pub mod commands;
pub mod config;
#[cfg(feature = "duckdb")]
pub mod duckdb_provider;
pub mod equality;
pub mod error;
pub mod metadata;
pub mod model;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod provider;
pub mod rows;
pub mod task;
pub mod transform;

pub use accumulator::{DiffReport, DiffSummary};
pub use config::{CompareOptions, StreamingSettings};
pub use error::{DiffError, Result};
pub use model::{ColumnDescriptor, DataType, DatasetHandle, DatasetMetadata, Row, StorageFamily, Value};
pub use orchestrator::{compare, CancellationToken, DiffJob, ProgressEvent, ProgressSink};
pub use provider::{DatasetProvider, FileProvider, MemoryProvider};
pub use task::{spawn_compare, JobEvent, JobHandle};
