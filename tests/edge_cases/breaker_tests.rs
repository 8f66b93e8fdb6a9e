//! Circuit breakers spanning several blocks

use crate::common::{metadata, provider_pair};
use dsdiff::orchestrator::NoProgress;
use dsdiff::{compare, CompareOptions, DataType, DatasetHandle, Row, StreamingSettings};
use serde_json::json;

fn rows(count: usize, offset: i64) -> Vec<Row> {
    (0..count).map(|i| vec![json!(i as i64 + offset), json!("same")]).collect()
}

fn run(options: CompareOptions, buffer_size: usize) -> dsdiff::DiffReport {
    let meta = metadata("VS", &[("VSSTRESN", DataType::Integer), ("VSTESTCD", DataType::String)]);
    let provider = provider_pair((meta.clone(), rows(10, 0)), (meta, rows(10, 1000)));
    compare(
        &provider,
        DatasetHandle::new("base"),
        DatasetHandle::new("compare"),
        options,
        StreamingSettings::new(buffer_size),
        &NoProgress,
    )
    .unwrap()
}

#[test]
fn test_column_limit_carries_across_blocks() {
    let report = run(
        CompareOptions {
            max_column_diff_count: Some(3),
            ..Default::default()
        },
        2,
    );

    // VSTESTCD never differs, so the job keeps going after VSSTRESN is frozen
    assert_eq!(report.data_diff.modified_rows.len(), 3);
    assert_eq!(report.summary.max_col_diff_reached, vec!["VSSTRESN"]);
    assert!(!report.summary.max_diff_reached);
    assert_eq!(report.summary.blocks_processed, 5);
    assert_eq!(report.summary.total_rows_checked, 10);
    assert_eq!(report.summary.last_diff_row, Some(3));
}

#[test]
fn test_all_columns_frozen_stops_the_job() {
    let meta = metadata("VS", &[("VSSTRESN", DataType::Integer)]);
    let base: Vec<Row> = (0..10).map(|i| vec![json!(i)]).collect();
    let cmp: Vec<Row> = (0..10).map(|i| vec![json!(i + 100)]).collect();
    let provider = provider_pair((meta.clone(), base), (meta, cmp));

    let options = CompareOptions {
        max_column_diff_count: Some(3),
        ..Default::default()
    };
    let report = compare(
        &provider,
        DatasetHandle::new("base"),
        DatasetHandle::new("compare"),
        options,
        StreamingSettings::new(2),
        &NoProgress,
    )
    .unwrap();

    assert_eq!(report.data_diff.modified_rows.len(), 3);
    assert!(report.summary.max_diff_reached);
    assert_eq!(report.summary.blocks_processed, 2);
}

#[test]
fn test_max_diff_count_is_checked_between_blocks() {
    let report = run(
        CompareOptions {
            max_diff_count: Some(3),
            ..Default::default()
        },
        2,
    );

    // The block that crosses the limit is kept whole
    assert!(report.summary.max_diff_reached);
    assert_eq!(report.summary.blocks_processed, 2);
    assert_eq!(report.summary.total_diffs, 4);
    assert_eq!(report.data_diff.modified_rows.len(), 4);
}

#[test]
fn test_tolerance_never_hides_string_differences() {
    let meta = metadata("VS", &[("VSORRES", DataType::String)]);
    let provider = provider_pair(
        (meta.clone(), vec![vec![json!("1")], vec![json!(1.0)]]),
        (meta, vec![vec![json!("1.0")], vec![json!(1.5)]]),
    );
    let options = CompareOptions {
        tolerance: 10.0,
        ..Default::default()
    };
    let report = compare(
        &provider,
        DatasetHandle::new("base"),
        DatasetHandle::new("compare"),
        options,
        StreamingSettings::default(),
        &NoProgress,
    )
    .unwrap();

    assert_eq!(report.data_diff.modified_rows.len(), 2);
}
