//! Comparisons between text and binary storage families

use dsdiff::orchestrator::NoProgress;
use dsdiff::{
    compare, ColumnDescriptor, CompareOptions, DataType, DatasetHandle, DatasetMetadata, MemoryProvider, StorageFamily,
    StreamingSettings,
};
use serde_json::json;

fn json_side() -> DatasetMetadata {
    DatasetMetadata {
        name: "AE".to_string(),
        label: "Adverse Events".to_string(),
        records: 0,
        columns: vec![
            ColumnDescriptor::new("USUBJID", DataType::String),
            ColumnDescriptor::new("BRTHDT", DataType::Date).with_target_data_type(DataType::Integer),
            ColumnDescriptor::new("AESTDTM", DataType::Datetime).with_target_data_type(DataType::Integer),
            ColumnDescriptor::new("AESTTM", DataType::Time).with_target_data_type(DataType::Integer),
            ColumnDescriptor::new("DOSE", DataType::Decimal),
            ColumnDescriptor::new("AECOMM", DataType::String),
        ],
    }
}

fn xpt_side() -> DatasetMetadata {
    DatasetMetadata {
        name: "AE".to_string(),
        label: "Adverse Events".to_string(),
        records: 0,
        columns: vec![
            ColumnDescriptor::new("USUBJID", DataType::String),
            ColumnDescriptor::new("BRTHDT", DataType::Double).with_length(8),
            ColumnDescriptor::new("AESTDTM", DataType::Double).with_length(8),
            ColumnDescriptor::new("AESTTM", DataType::Double).with_length(8),
            ColumnDescriptor::new("DOSE", DataType::Double).with_length(8),
            ColumnDescriptor::new("AECOMM", DataType::String),
        ],
    }
}

fn provider(json_rows: Vec<Vec<serde_json::Value>>, xpt_rows: Vec<Vec<serde_json::Value>>) -> MemoryProvider {
    let mut provider = MemoryProvider::new();
    provider.insert("ae.json", json_side(), json_rows);
    provider.insert("ae.xpt", xpt_side(), xpt_rows);
    provider
}

#[test]
fn test_text_values_match_sas_numbers() {
    let provider = provider(
        vec![vec![
            json!("S1"),
            json!("1970-01-01"),
            json!("1970-01-01T00:00:10"),
            json!("01:00:00"),
            json!("1.50"),
            json!(null),
        ]],
        vec![vec![
            json!("S1"),
            json!(3653),
            json!(315_619_210),
            json!(3600),
            json!(1.5),
            json!(""),
        ]],
    );

    let base = DatasetHandle::new("ae.json");
    let cmp = DatasetHandle::new("ae.xpt");
    assert!(StorageFamily::is_cross_family(base.family, cmp.family));

    let report = compare(&provider, base, cmp, CompareOptions::default(), StreamingSettings::default(), &NoProgress).unwrap();

    assert!(report.data_diff.modified_rows.is_empty(), "{:?}", report.data_diff.modified_rows);
    // Storage-driven type and length differences are not schema changes across families
    assert!(report.metadata_diff.attribute_diffs.is_empty(), "{:?}", report.metadata_diff.attribute_diffs);
}

#[test]
fn test_real_date_difference_is_reported_in_sas_days() {
    let provider = provider(
        vec![vec![json!("S1"), json!("1970-01-02"), json!(null), json!(null), json!(null), json!("")]],
        vec![vec![json!("S1"), json!(3653), json!(null), json!(null), json!(null), json!("")]],
    );

    let report = compare(
        &provider,
        DatasetHandle::new("ae.json"),
        DatasetHandle::new("ae.xpt"),
        CompareOptions::default(),
        StreamingSettings::default(),
        &NoProgress,
    )
    .unwrap();

    let modified = &report.data_diff.modified_rows;
    assert_eq!(modified.len(), 1);
    assert_eq!(modified[0].diff["BRTHDT"], (json!(3654), json!(3653)));
}

#[test]
fn test_same_family_skips_canonicalization() {
    let provider = provider(
        vec![vec![json!("S1"), json!("1970-01-01"), json!(null), json!(null), json!(null), json!(null)]],
        vec![vec![json!("S1"), json!(3653), json!(null), json!(null), json!(null), json!(null)]],
    );

    // Force both sides into the same family: values are compared as stored
    let report = compare(
        &provider,
        DatasetHandle::new("ae.json").with_family(StorageFamily::Binary),
        DatasetHandle::new("ae.xpt"),
        CompareOptions::default(),
        StreamingSettings::default(),
        &NoProgress,
    )
    .unwrap();

    assert_eq!(report.data_diff.modified_rows.len(), 1);
    assert_eq!(report.data_diff.modified_rows[0].diff["BRTHDT"], (json!("1970-01-01"), json!(3653)));
    assert_eq!(
        report.metadata_diff.attribute_diffs["BRTHDT"]["dataType"].base,
        json!("date")
    );
}

#[test]
fn test_sql_typed_temporal_columns_across_families() {
    // Column descriptors as read from CSV (text) and Parquet (binary) files
    let columns = vec![
        ColumnDescriptor::from_sql("BRTHDT", "DATE"),
        ColumnDescriptor::from_sql("AESTDTM", "TIMESTAMP"),
        ColumnDescriptor::from_sql("AESTTM", "TIME"),
    ];
    let meta = DatasetMetadata {
        name: "DM".to_string(),
        label: String::new(),
        records: 0,
        columns,
    };

    let mut provider = MemoryProvider::new();
    provider.insert(
        "dm.csv",
        meta.clone(),
        vec![
            vec![json!("2020-01-01"), json!("1970-01-01T00:00:00.600"), json!("01:00:00")],
            vec![json!(null), json!(null), json!(null)],
            vec![json!("2020-01-02"), json!(null), json!(null)],
        ],
    );
    provider.insert(
        "dm.parquet",
        meta,
        vec![
            vec![json!(21915), json!(315_619_201), json!(3600)],
            vec![json!(null), json!(null), json!(null)],
            vec![json!(21915), json!(null), json!(null)],
        ],
    );

    let report = compare(
        &provider,
        DatasetHandle::new("dm.csv"),
        DatasetHandle::new("dm.parquet"),
        CompareOptions::default(),
        StreamingSettings::default(),
        &NoProgress,
    )
    .unwrap();

    // Equal dates and missing values match; only the real date change is reported
    let modified = &report.data_diff.modified_rows;
    assert_eq!(modified.len(), 1, "{:?}", modified);
    assert_eq!(modified[0].row_base, 3);
    assert_eq!(modified[0].diff["BRTHDT"], (json!(21916), json!(21915)));
    assert!(!report.metadata_diff.has_changes());
}
