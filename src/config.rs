//! Comparison options and streaming settings

use crate::equality::DEFAULT_TOLERANCE;
use crate::error::{DiffError, Result};
use crate::metadata::MetadataOptions;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of rows fetched per block
pub const DEFAULT_BUFFER_SIZE: usize = 10000;

/// User-facing options of one comparison job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompareOptions {
    /// Largest absolute difference still equal for numeric columns
    pub tolerance: f64,
    /// Identifier columns for key-based row matching; positional when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_columns: Option<Vec<String>>,
    /// Stop processing blocks once this many differences are recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_diff_count: Option<u64>,
    /// Stop recording differences for a column after this many
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_column_diff_count: Option<u64>,
    pub ignore_column_case: bool,
    /// Case-insensitive pattern of column names to leave out
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compare_filter: Option<String>,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            id_columns: None,
            max_diff_count: None,
            max_column_diff_count: None,
            ignore_column_case: false,
            ignore_pattern: None,
            base_filter: None,
            compare_filter: None,
        }
    }
}

/// How rows of the two datasets are paired
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchStrategy {
    Positional,
    KeyBased(Vec<String>),
}

impl CompareOptions {
    /// Load options from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DiffError::config(format!("Cannot read options file {}: {}", path.display(), e))
        })?;
        let options: Self = serde_json::from_str(&content)?;
        Ok(options)
    }

    /// Check every option that can be checked without the datasets
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(DiffError::config(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        if self.max_diff_count == Some(0) {
            return Err(DiffError::config("maxDiffCount must be greater than 0"));
        }
        if self.max_column_diff_count == Some(0) {
            return Err(DiffError::config("maxColumnDiffCount must be greater than 0"));
        }
        if let Some(ids) = &self.id_columns {
            if ids.iter().any(|id| id.trim().is_empty()) {
                return Err(DiffError::config("idColumns must not contain empty names"));
            }
        }
        self.compile_ignore_pattern()?;
        Ok(())
    }

    pub fn compile_ignore_pattern(&self) -> Result<Option<Regex>> {
        match self.ignore_pattern.as_deref() {
            None | Some("") => Ok(None),
            Some(pattern) => {
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| DiffError::config(format!("Invalid ignorePattern '{}': {}", pattern, e)))?;
                Ok(Some(regex))
            }
        }
    }

    pub fn match_strategy(&self) -> MatchStrategy {
        match &self.id_columns {
            Some(ids) if !ids.is_empty() => MatchStrategy::KeyBased(ids.clone()),
            _ => MatchStrategy::Positional,
        }
    }

    pub fn metadata_options(&self, cross_family: bool) -> Result<MetadataOptions> {
        Ok(MetadataOptions {
            ignore_column_case: self.ignore_column_case,
            ignore_pattern: self.compile_ignore_pattern()?,
            cross_family,
        })
    }

    /// Overlay values set in `other` onto these options
    pub fn merge(mut self, other: CompareOptions) -> Self {
        let defaults = CompareOptions::default();
        if other.tolerance != defaults.tolerance {
            self.tolerance = other.tolerance;
        }
        self.id_columns = other.id_columns.or(self.id_columns);
        self.max_diff_count = other.max_diff_count.or(self.max_diff_count);
        self.max_column_diff_count = other.max_column_diff_count.or(self.max_column_diff_count);
        self.ignore_column_case |= other.ignore_column_case;
        self.ignore_pattern = other.ignore_pattern.or(self.ignore_pattern);
        self.base_filter = other.base_filter.or(self.base_filter);
        self.compare_filter = other.compare_filter.or(self.compare_filter);
        self
    }
}

/// Memory bound of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamingSettings {
    /// Rows fetched from each dataset per block
    pub buffer_size: usize,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl StreamingSettings {
    pub fn new(buffer_size: usize) -> Self {
        Self { buffer_size }
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(DiffError::config("bufferSize must be greater than 0"));
        }
        Ok(())
    }
}
