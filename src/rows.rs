//! Row alignment and per-cell differences for one block

use crate::config::MatchStrategy;
use crate::equality::values_equal;
use crate::error::{DiffError, Result};
use crate::metadata::{ColumnPair, MetadataOptions};
use crate::model::{Row, Value};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Differing cells of one row pair: column name -> [base value, compare value]
pub type CellDiffs = IndexMap<String, (Value, Value)>;

/// A matched row pair with at least one differing cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffRow {
    /// 1-based row number in the base dataset
    pub row_base: u64,
    /// 1-based row number in the compare dataset
    pub row_compare: u64,
    pub diff: CellDiffs,
}

/// Row level differences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDiff {
    pub added_rows: Vec<Row>,
    pub deleted_rows: Vec<Row>,
    pub modified_rows: Vec<DiffRow>,
}

impl DataDiff {
    pub fn is_empty(&self) -> bool {
        self.added_rows.is_empty() && self.deleted_rows.is_empty() && self.modified_rows.is_empty()
    }

    /// Concatenate another fragment onto this one
    pub fn append(&mut self, mut other: DataDiff) {
        self.added_rows.append(&mut other.added_rows);
        self.deleted_rows.append(&mut other.deleted_rows);
        self.modified_rows.append(&mut other.modified_rows);
    }
}

/// Circuit breaker state that carries over from one block to the next
#[derive(Debug, Clone, Default)]
pub struct RunningState {
    column_diff_counts: HashMap<String, u64>,
    max_col_diff_reached: IndexSet<String>,
    max_diff_reached: bool,
}

impl RunningState {
    pub fn is_frozen(&self, column: &str) -> bool {
        self.max_col_diff_reached.contains(column)
    }

    pub fn frozen_columns(&self) -> impl Iterator<Item = &String> {
        self.max_col_diff_reached.iter()
    }

    pub fn max_diff_reached(&self) -> bool {
        self.max_diff_reached
    }

    pub fn column_diff_count(&self, column: &str) -> u64 {
        self.column_diff_counts.get(column).copied().unwrap_or(0)
    }
}

/// What one block contributed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockDiff {
    pub data: DataDiff,
    pub first_diff_row: Option<u64>,
    pub last_diff_row: Option<u64>,
    pub rows_checked: u64,
    /// Columns frozen so far, including earlier blocks
    pub max_col_diff_reached: Vec<String>,
    /// Every common column is frozen
    pub max_diff_reached: bool,
}

impl BlockDiff {
    fn record_row(&mut self, row: u64) {
        self.first_diff_row = Some(self.first_diff_row.map_or(row, |r| r.min(row)));
        self.last_diff_row = Some(self.last_diff_row.map_or(row, |r| r.max(row)));
    }

    /// Trailing rows present on only one side of the job
    pub fn unmatched(rows: Vec<Row>, added: bool, row_offset: u64) -> Self {
        let mut block = BlockDiff {
            rows_checked: rows.len() as u64,
            ..Default::default()
        };
        if !rows.is_empty() {
            block.first_diff_row = Some(row_offset + 1);
            block.last_diff_row = Some(row_offset + rows.len() as u64);
        }
        if added {
            block.data.added_rows = rows;
        } else {
            block.data.deleted_rows = rows;
        }
        block
    }
}

#[derive(Debug, Clone)]
enum Alignment {
    Positional,
    Keyed {
        base_key: Vec<usize>,
        compare_key: Vec<usize>,
    },
}

/// Aligns rows and builds per-row differences, configured once per job
#[derive(Debug, Clone)]
pub struct RowMatcher {
    pairs: Vec<ColumnPair>,
    alignment: Alignment,
    tolerance: f64,
    max_column_diff_count: Option<u64>,
}

impl RowMatcher {
    /// Resolve the strategy's identifier columns against the common columns
    pub fn new(
        pairs: Vec<ColumnPair>,
        strategy: &MatchStrategy,
        metadata_options: &MetadataOptions,
        tolerance: f64,
        max_column_diff_count: Option<u64>,
    ) -> Result<Self> {
        let alignment = match strategy {
            MatchStrategy::Positional => Alignment::Positional,
            MatchStrategy::KeyBased(ids) => {
                let mut base_key = Vec::with_capacity(ids.len());
                let mut compare_key = Vec::with_capacity(ids.len());
                for id in ids {
                    let key = metadata_options.fold(id);
                    let pair = pairs.iter().find(|p| p.key == key).ok_or_else(|| {
                        DiffError::config(format!("Identifier column '{}' is not present in both datasets", id))
                    })?;
                    base_key.push(pair.base_index);
                    compare_key.push(pair.compare_index);
                }
                Alignment::Keyed { base_key, compare_key }
            }
        };

        Ok(Self {
            pairs,
            alignment,
            tolerance,
            max_column_diff_count,
        })
    }

    pub fn is_positional(&self) -> bool {
        matches!(self.alignment, Alignment::Positional)
    }

    pub fn pairs(&self) -> &[ColumnPair] {
        &self.pairs
    }

    /// Compare one block. `row_offset` is the absolute index of the block's first row.
    pub fn compare_block(&self, base_rows: &[Row], compare_rows: &[Row], state: &mut RunningState, row_offset: u64) -> BlockDiff {
        let mut block = BlockDiff {
            rows_checked: base_rows.len().min(compare_rows.len()) as u64,
            ..Default::default()
        };

        match &self.alignment {
            Alignment::Positional => {
                for (i, (base, compare)) in base_rows.iter().zip(compare_rows).enumerate() {
                    let row = row_offset + i as u64 + 1;
                    self.push_if_different(&mut block, state, base, compare, row, row);
                }
            }
            Alignment::Keyed { base_key, compare_key } => {
                let mut index: HashMap<String, usize> = HashMap::with_capacity(base_rows.len());
                for (i, row) in base_rows.iter().enumerate() {
                    if let Some(previous) = index.insert(row_key(row, base_key), i) {
                        log::debug!(
                            "Duplicate key in base rows {} and {}, keeping the later row",
                            row_offset + previous as u64 + 1,
                            row_offset + i as u64 + 1
                        );
                    }
                }
                for (j, compare) in compare_rows.iter().enumerate() {
                    if let Some(&i) = index.get(&row_key(compare, compare_key)) {
                        let row_base = row_offset + i as u64 + 1;
                        let row_compare = row_offset + j as u64 + 1;
                        self.push_if_different(&mut block, state, &base_rows[i], compare, row_base, row_compare);
                    }
                }
            }
        }

        block.max_col_diff_reached = state.frozen_columns().cloned().collect();
        block.max_diff_reached = state.max_diff_reached();
        block
    }

    fn push_if_different(
        &self,
        block: &mut BlockDiff,
        state: &mut RunningState,
        base: &Row,
        compare: &Row,
        row_base: u64,
        row_compare: u64,
    ) {
        let diff = self.diff_row(base, compare, state);
        if !diff.is_empty() {
            block.record_row(row_base);
            block.data.modified_rows.push(DiffRow {
                row_base,
                row_compare,
                diff,
            });
        }
    }

    /// Differing cells of a row pair, updating the per-column breakers
    pub fn diff_row(&self, base: &Row, compare: &Row, state: &mut RunningState) -> CellDiffs {
        let mut diffs = CellDiffs::new();

        for pair in &self.pairs {
            if state.is_frozen(&pair.name) {
                continue;
            }
            let base_value = base.get(pair.base_index).unwrap_or(&Value::Null);
            let compare_value = compare.get(pair.compare_index).unwrap_or(&Value::Null);

            if values_equal(base_value, compare_value, pair.semantic_type(), self.tolerance) {
                continue;
            }

            diffs.insert(pair.name.clone(), (base_value.clone(), compare_value.clone()));

            let count = state.column_diff_counts.entry(pair.name.clone()).or_insert(0);
            *count += 1;
            if let Some(limit) = self.max_column_diff_count {
                if *count >= limit {
                    log::debug!("Column '{}' reached {} differences, no longer tracked", pair.name, limit);
                    state.max_col_diff_reached.insert(pair.name.clone());
                    if self.pairs.iter().all(|p| state.is_frozen(&p.name)) {
                        state.max_diff_reached = true;
                    }
                }
            }
        }

        diffs
    }
}

/// Literal key of a row: identifier values joined by `|`
fn row_key(row: &Row, key_indices: &[usize]) -> String {
    key_indices
        .iter()
        .map(|&i| key_part(row.get(i).unwrap_or(&Value::Null)))
        .collect::<Vec<_>>()
        .join("|")
}

fn key_part(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}
