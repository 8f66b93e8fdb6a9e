//! Schema comparison between two datasets

use crate::model::{ColumnDescriptor, DataType, DatasetMetadata, Value};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Column attributes compared for every common column, in report order
pub const COLUMN_ATTRIBUTES: [&str; 5] = ["label", "dataType", "length", "displayFormat", "targetDataType"];

/// Declared types a generic double may stand in for when the families differ
const DOUBLE_EQUIVALENT_TYPES: [DataType; 7] = [
    DataType::Integer,
    DataType::Float,
    DataType::Double,
    DataType::Decimal,
    DataType::Date,
    DataType::Datetime,
    DataType::Time,
];

/// One attribute that differs between base and compare
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDiff {
    pub base: Value,
    pub compare: Value,
}

/// 1-based column positions of a common column that moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionDiff {
    pub base: usize,
    pub compare: usize,
}

/// Schema level differences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataDiff {
    pub missing_in_base: Vec<String>,
    pub missing_in_compare: Vec<String>,
    pub common_cols: Vec<String>,
    pub position_diffs: IndexMap<String, PositionDiff>,
    pub attribute_diffs: IndexMap<String, IndexMap<String, AttributeDiff>>,
    pub ds_attribute_diffs: IndexMap<String, AttributeDiff>,
}

impl MetadataDiff {
    pub fn has_changes(&self) -> bool {
        !self.missing_in_base.is_empty()
            || !self.missing_in_compare.is_empty()
            || !self.position_diffs.is_empty()
            || !self.attribute_diffs.is_empty()
            || !self.ds_attribute_diffs.is_empty()
    }
}

/// A column present on both sides, with each side's own cell index
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPair {
    /// Name used in reports (the base spelling)
    pub name: String,
    /// Lookup key, lowercased in case-insensitive mode
    pub key: String,
    pub base_index: usize,
    pub compare_index: usize,
    pub base_type: DataType,
    pub compare_type: DataType,
}

impl ColumnPair {
    /// Semantic type driving the equality policy: numeric if either side declares a numeric type
    pub fn semantic_type(&self) -> DataType {
        if self.base_type.is_numeric() {
            self.base_type
        } else if self.compare_type.is_numeric() {
            self.compare_type
        } else {
            self.base_type
        }
    }
}

/// Settings for a metadata comparison
#[derive(Debug, Clone, Default)]
pub struct MetadataOptions {
    pub ignore_column_case: bool,
    /// Columns matching this case-insensitive pattern are left out entirely
    pub ignore_pattern: Option<Regex>,
    /// Base and compare come from different storage families
    pub cross_family: bool,
}

impl MetadataOptions {
    pub fn fold(&self, name: &str) -> String {
        if self.ignore_column_case {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }
}

/// Result of a schema comparison: the report plus the aligned common columns
#[derive(Debug, Clone)]
pub struct MetadataComparison {
    pub diff: MetadataDiff,
    pub pairs: Vec<ColumnPair>,
}

/// Compare two dataset schemas
pub fn compare_metadata(base: &DatasetMetadata, compare: &DatasetMetadata, options: &MetadataOptions) -> MetadataDiff {
    MetadataComparator::new(options).compare(base, compare).diff
}

pub struct MetadataComparator<'a> {
    options: &'a MetadataOptions,
}

impl<'a> MetadataComparator<'a> {
    pub fn new(options: &'a MetadataOptions) -> Self {
        Self { options }
    }

    pub fn compare(&self, base: &DatasetMetadata, compare: &DatasetMetadata) -> MetadataComparison {
        let base_cols = self.index_columns(base);
        let compare_cols = self.index_columns(compare);

        // Ordered union: base names first, then compare-only names
        let mut union: Vec<&str> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for key in base_cols.keys().chain(compare_cols.keys()) {
            if seen.insert(key.as_str()) {
                union.push(key.as_str());
            }
        }

        let mut diff = MetadataDiff::default();
        let mut pairs = Vec::new();

        for key in union {
            match (base_cols.get(key), compare_cols.get(key)) {
                (Some(&(_, col)), None) => diff.missing_in_compare.push(col.name.clone()),
                (None, Some(&(_, col))) => diff.missing_in_base.push(col.name.clone()),
                (Some(&(base_index, base_col)), Some(&(compare_index, compare_col))) => {
                    let name = base_col.name.clone();
                    diff.common_cols.push(name.clone());

                    if base_index != compare_index {
                        diff.position_diffs.insert(
                            name.clone(),
                            PositionDiff {
                                base: base_index + 1,
                                compare: compare_index + 1,
                            },
                        );
                    }

                    let attrs = self.compare_columns(base_col, compare_col);
                    if !attrs.is_empty() {
                        diff.attribute_diffs.insert(name.clone(), attrs);
                    }

                    pairs.push(ColumnPair {
                        name,
                        key: key.to_string(),
                        base_index,
                        compare_index,
                        base_type: base_col.data_type,
                        compare_type: compare_col.data_type,
                    });
                }
                (None, None) => {}
            }
        }

        diff.ds_attribute_diffs = compare_dataset_attributes(base, compare);

        log::debug!(
            "Metadata compared: {} common, {} missing in base, {} missing in compare",
            diff.common_cols.len(),
            diff.missing_in_base.len(),
            diff.missing_in_compare.len()
        );

        MetadataComparison { diff, pairs }
    }

    /// Key -> (original cell index, descriptor); the first spelling of a folded name wins
    fn index_columns<'m>(&self, meta: &'m DatasetMetadata) -> IndexMap<String, (usize, &'m ColumnDescriptor)> {
        let mut columns = IndexMap::new();
        for (index, col) in meta.columns.iter().enumerate() {
            if let Some(pattern) = &self.options.ignore_pattern {
                if pattern.is_match(&col.name) {
                    continue;
                }
            }
            let key = self.options.fold(&col.name);
            if columns.contains_key(&key) {
                log::warn!(
                    "Dataset '{}': column '{}' duplicates an earlier column when case is ignored, skipping",
                    meta.name,
                    col.name
                );
                continue;
            }
            columns.insert(key, (index, col));
        }
        columns
    }

    fn compare_columns(&self, base: &ColumnDescriptor, compare: &ColumnDescriptor) -> IndexMap<String, AttributeDiff> {
        let mut attrs = IndexMap::new();
        let numeric_equivalent = self.options.cross_family && is_double_equivalent(base.data_type, compare.data_type);

        for attr in COLUMN_ATTRIBUTES {
            let skip = match attr {
                "targetDataType" => self.options.cross_family,
                "dataType" | "length" => numeric_equivalent,
                _ => false,
            };
            if skip {
                continue;
            }
            let (b, c) = (column_attribute(base, attr), column_attribute(compare, attr));
            if b != c {
                attrs.insert(attr.to_string(), AttributeDiff { base: b, compare: c });
            }
        }
        attrs
    }
}

fn is_double_equivalent(base: DataType, compare: DataType) -> bool {
    (base == DataType::Double && DOUBLE_EQUIVALENT_TYPES.contains(&compare))
        || (compare == DataType::Double && DOUBLE_EQUIVALENT_TYPES.contains(&base))
}

fn column_attribute(col: &ColumnDescriptor, attr: &str) -> Value {
    match attr {
        "label" => Value::from(col.label.as_str()),
        "dataType" => Value::from(col.data_type.as_str()),
        "length" => col.length.map(Value::from).unwrap_or(Value::Null),
        "displayFormat" => col.display_format.as_deref().map(Value::from).unwrap_or(Value::Null),
        "targetDataType" => col
            .target_data_type
            .map(|t| Value::from(t.as_str()))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn compare_dataset_attributes(base: &DatasetMetadata, compare: &DatasetMetadata) -> IndexMap<String, AttributeDiff> {
    let candidates = [
        ("label", Value::from(base.label.as_str()), Value::from(compare.label.as_str())),
        ("name", Value::from(base.name.as_str()), Value::from(compare.name.as_str())),
        ("records", Value::from(base.records), Value::from(compare.records)),
    ];

    candidates
        .into_iter()
        .filter(|(_, b, c)| b != c)
        .map(|(attr, base, compare)| (attr.to_string(), AttributeDiff { base, compare }))
        .collect()
}
