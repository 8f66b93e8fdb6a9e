//! Running totals merged block by block, and the final report

use crate::metadata::MetadataDiff;
use crate::rows::{BlockDiff, DataDiff};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Statistics of a comparison job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    pub first_diff_row: Option<u64>,
    pub last_diff_row: Option<u64>,
    pub total_diffs: u64,
    pub max_diff_reached: bool,
    pub max_col_diff_reached: Vec<String>,
    pub cols_with_data_diffs: Vec<String>,
    pub cols_with_metadata_diffs: Vec<String>,
    pub cols_without_diffs: Vec<String>,
    pub total_rows_checked: u64,
    /// Rows the job expects to visit, for progress reporting
    pub total_rows: u64,
    pub blocks_processed: u64,
}

/// Merge one block into a summary snapshot. Breaker flags only ever grow.
pub fn merge_summary(previous: &DiffSummary, block: &BlockDiff, max_diff_count: Option<u64>) -> DiffSummary {
    let mut next = previous.clone();

    if let Some(first) = block.first_diff_row {
        next.first_diff_row = Some(previous.first_diff_row.map_or(first, |p| p.min(first)));
    }
    if let Some(last) = block.last_diff_row {
        next.last_diff_row = Some(previous.last_diff_row.map_or(last, |p| p.max(last)));
    }

    next.total_diffs += (block.data.modified_rows.len() + block.data.deleted_rows.len()) as u64;
    next.total_rows_checked += block.rows_checked;
    next.blocks_processed += 1;

    for column in &block.max_col_diff_reached {
        if !next.max_col_diff_reached.contains(column) {
            next.max_col_diff_reached.push(column.clone());
        }
    }

    let limit_hit = max_diff_count.map_or(false, |limit| next.total_diffs >= limit);
    next.max_diff_reached = previous.max_diff_reached || block.max_diff_reached || limit_hit;

    next
}

/// Complete result of a comparison job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffReport {
    pub metadata_diff: MetadataDiff,
    pub data_diff: DataDiff,
    pub summary: DiffSummary,
}

impl DiffReport {
    pub fn has_differences(&self) -> bool {
        self.metadata_diff.has_changes() || !self.data_diff.is_empty()
    }
}

/// Owns the running summary and concatenated row differences of one job
#[derive(Debug, Default)]
pub struct DiffAccumulator {
    summary: DiffSummary,
    data: DataDiff,
    max_diff_count: Option<u64>,
}

impl DiffAccumulator {
    pub fn new(total_rows: u64, max_diff_count: Option<u64>) -> Self {
        Self {
            summary: DiffSummary {
                total_rows,
                ..Default::default()
            },
            data: DataDiff::default(),
            max_diff_count,
        }
    }

    pub fn merge_block(&mut self, block: BlockDiff) {
        self.summary = merge_summary(&self.summary, &block, self.max_diff_count);
        self.data.append(block.data);
    }

    pub fn summary(&self) -> &DiffSummary {
        &self.summary
    }

    pub fn max_diff_reached(&self) -> bool {
        self.summary.max_diff_reached
    }

    /// Percentage of rows checked, held below 100 until the job ends
    pub fn percent(&self) -> u8 {
        if self.summary.total_rows == 0 {
            return 0;
        }
        let ratio = self.summary.total_rows_checked as f64 / self.summary.total_rows as f64;
        ((ratio * 100.0).round() as u64).min(99) as u8
    }

    /// Fill in the fields that need the whole job and build the report
    pub fn finish(self, metadata_diff: MetadataDiff) -> DiffReport {
        let mut summary = self.summary;

        let mut data_cols: IndexSet<&str> = IndexSet::new();
        for row in &self.data.modified_rows {
            data_cols.extend(row.diff.keys().map(String::as_str));
        }
        summary.cols_with_data_diffs = data_cols.iter().map(|c| c.to_string()).collect();
        summary.cols_with_metadata_diffs = metadata_diff.attribute_diffs.keys().cloned().collect();
        summary.cols_without_diffs = metadata_diff
            .common_cols
            .iter()
            .filter(|c| !data_cols.contains(c.as_str()) && !metadata_diff.attribute_diffs.contains_key(*c))
            .cloned()
            .collect();

        DiffReport {
            metadata_diff,
            data_diff: self.data,
            summary,
        }
    }
}
