//! Output formatting utilities

use crate::accumulator::{DiffReport, DiffSummary};
use crate::error::Result;
use crate::metadata::MetadataDiff;
use crate::model::Value;
use crate::rows::DataDiff;
use std::fmt::Write;

/// Rows shown per section in pretty output
const SAMPLE_ROWS: usize = 3;

/// Cells shown per modified row in pretty output
const SAMPLE_CELLS: usize = 2;

/// Pretty printer for dsdiff output
pub struct PrettyPrinter;

impl PrettyPrinter {
    pub fn print_report(report: &DiffReport, quiet: bool) {
        print!("{}", Self::render_report(report, quiet));
    }

    pub fn print_metadata_diff(diff: &MetadataDiff) {
        let mut out = String::from("📋 dsdiff metadata\n");
        Self::render_metadata(&mut out, diff, "");
        print!("{}", out);
    }

    /// Render a full report as a tree
    pub fn render_report(report: &DiffReport, quiet: bool) -> String {
        let summary = &report.summary;
        let mut out = String::new();

        if quiet {
            // Machine-readable output
            let _ = writeln!(out, "metadata_changed={}", report.metadata_diff.has_changes());
            let _ = writeln!(out, "total_diffs={}", summary.total_diffs);
            let _ = writeln!(out, "rows_checked={}", summary.total_rows_checked);
            let _ = writeln!(out, "max_diff_reached={}", summary.max_diff_reached);
            return out;
        }

        let _ = writeln!(out, "📊 dsdiff compare");

        if report.metadata_diff.has_changes() {
            let _ = writeln!(out, "├─ ❌ Metadata: CHANGED");
            Self::render_metadata(&mut out, &report.metadata_diff, "│  ");
        } else {
            let _ = writeln!(out, "├─ ✅ Metadata: unchanged");
        }

        if report.data_diff.is_empty() {
            let _ = writeln!(out, "├─ ✅ Data: unchanged");
        } else {
            let _ = writeln!(out, "├─ ❌ Data: {} differences", summary.total_diffs);
            Self::render_data(&mut out, &report.data_diff, "│  ");
        }

        Self::render_summary(&mut out, summary);
        out
    }

    fn render_metadata(out: &mut String, diff: &MetadataDiff, prefix: &str) {
        if !diff.missing_in_base.is_empty() {
            let _ = writeln!(out, "{}├─ Missing in base: {}", prefix, diff.missing_in_base.join(", "));
        }
        if !diff.missing_in_compare.is_empty() {
            let _ = writeln!(out, "{}├─ Missing in compare: {}", prefix, diff.missing_in_compare.join(", "));
        }
        for (name, pos) in &diff.position_diffs {
            let _ = writeln!(out, "{}├─ {} moved: position {} → {}", prefix, name, pos.base, pos.compare);
        }
        for (name, attrs) in &diff.attribute_diffs {
            for (attr, change) in attrs {
                let _ = writeln!(
                    out,
                    "{}├─ {}.{}: {} → {}",
                    prefix,
                    name,
                    attr,
                    display_value(&change.base),
                    display_value(&change.compare)
                );
            }
        }
        for (attr, change) in &diff.ds_attribute_diffs {
            let _ = writeln!(
                out,
                "{}├─ dataset {}: {} → {}",
                prefix,
                attr,
                display_value(&change.base),
                display_value(&change.compare)
            );
        }
        let _ = writeln!(out, "{}└─ Common columns: {}", prefix, diff.common_cols.len());
    }

    fn render_data(out: &mut String, data: &DataDiff, prefix: &str) {
        if !data.modified_rows.is_empty() {
            let _ = writeln!(out, "{}├─ Modified rows: {}", prefix, data.modified_rows.len());
            for row in data.modified_rows.iter().take(SAMPLE_ROWS) {
                let _ = writeln!(
                    out,
                    "{}│  ├─ Row {} / {}: {} columns changed",
                    prefix,
                    row.row_base,
                    row.row_compare,
                    row.diff.len()
                );
                for (col, (base, compare)) in row.diff.iter().take(SAMPLE_CELLS) {
                    let _ = writeln!(
                        out,
                        "{}│  │  └─ {}: {} → {}",
                        prefix,
                        col,
                        display_value(base),
                        display_value(compare)
                    );
                }
                if row.diff.len() > SAMPLE_CELLS {
                    let _ = writeln!(out, "{}│  │  └─ ... and {} more", prefix, row.diff.len() - SAMPLE_CELLS);
                }
            }
            if data.modified_rows.len() > SAMPLE_ROWS {
                let _ = writeln!(
                    out,
                    "{}│  └─ ... and {} more modified rows",
                    prefix,
                    data.modified_rows.len() - SAMPLE_ROWS
                );
            }
        }
        if !data.added_rows.is_empty() {
            let _ = writeln!(out, "{}├─ Added rows: {}", prefix, data.added_rows.len());
        }
        if !data.deleted_rows.is_empty() {
            let _ = writeln!(out, "{}└─ Deleted rows: {}", prefix, data.deleted_rows.len());
        }
    }

    fn render_summary(out: &mut String, summary: &DiffSummary) {
        if let (Some(first), Some(last)) = (summary.first_diff_row, summary.last_diff_row) {
            let _ = writeln!(out, "├─ Differences between rows {} and {}", first, last);
        }
        if !summary.max_col_diff_reached.is_empty() {
            let _ = writeln!(
                out,
                "├─ ⚠️  Column limit reached: {}",
                summary.max_col_diff_reached.join(", ")
            );
        }
        if summary.max_diff_reached {
            let _ = writeln!(out, "├─ ⚠️  Difference limit reached, comparison stopped early");
        }
        let _ = writeln!(
            out,
            "└─ Rows checked: {} ({} blocks)",
            summary.total_rows_checked, summary.blocks_processed
        );
    }
}

/// Cell values without JSON quoting for strings
fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => format!("'{}'", s),
        other => other.to_string(),
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as JSON
    pub fn format<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    pub fn format_report(report: &DiffReport) -> Result<String> {
        Self::format(report)
    }
}
