//! Command-line interface for dsdiff

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dsdiff")]
#[command(about = "Compare the schema and content of two tabular datasets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare metadata and data of two datasets
    Compare {
        /// Base dataset path
        base: String,

        /// Compare dataset path
        compare: String,

        #[command(flatten)]
        args: CompareArgs,

        /// Rows fetched per block (must be > 0)
        #[arg(long, default_value = "10000", value_parser = validate_buffer_size)]
        buffer_size: usize,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,

        /// Write the report to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Quiet output (machine-readable)
        #[arg(long)]
        quiet: bool,
    },

    /// Compare only the metadata of two datasets
    Metadata {
        /// Base dataset path
        base: String,

        /// Compare dataset path
        compare: String,

        /// Match column names case-insensitively
        #[arg(long)]
        ignore_column_case: bool,

        /// Case-insensitive regular expression of column names to skip
        #[arg(long)]
        ignore_pattern: Option<String>,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },
}

/// Options shared with the JSON options file; flags win over the file
#[derive(Args, Debug, Clone, Default)]
pub struct CompareArgs {
    /// JSON file with comparison options
    #[arg(long)]
    pub options: Option<PathBuf>,

    /// Absolute tolerance for numeric columns
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Identifier column for key-based matching (repeatable)
    #[arg(long = "id-column")]
    pub id_columns: Vec<String>,

    /// Stop after this many differences
    #[arg(long)]
    pub max_diff_count: Option<u64>,

    /// Stop reporting a column after this many differences
    #[arg(long)]
    pub max_column_diff_count: Option<u64>,

    /// Match column names case-insensitively
    #[arg(long)]
    pub ignore_column_case: bool,

    /// Case-insensitive regular expression of column names to skip
    #[arg(long)]
    pub ignore_pattern: Option<String>,

    /// Row filter applied to the base dataset
    #[arg(long)]
    pub base_filter: Option<String>,

    /// Row filter applied to the compare dataset
    #[arg(long)]
    pub compare_filter: Option<String>,
}

/// Parse output format string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {}. Use 'pretty' or 'json'", s)),
        }
    }
}

/// Validate that buffer size is greater than 0
fn validate_buffer_size(s: &str) -> Result<usize, String> {
    let size: usize = s
        .parse()
        .map_err(|_| format!("Invalid buffer size: '{}'. Must be a positive integer.", s))?;

    if size == 0 {
        return Err("Buffer size must be greater than 0".to_string());
    }

    Ok(size)
}
