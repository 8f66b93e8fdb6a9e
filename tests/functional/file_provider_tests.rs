//! Comparisons of Dataset-JSON and NDJSON files on disk

use crate::common::{sample_data, TestFixture};
use dsdiff::orchestrator::NoProgress;
use dsdiff::provider::DatasetJsonProvider;
use dsdiff::{compare, CompareOptions, DatasetHandle, DatasetProvider, FileProvider, StreamingSettings};
use serde_json::json;

#[test]
fn test_json_against_ndjson() {
    let fixture = TestFixture::new().unwrap();
    let columns = sample_data::demographics_columns();
    let base_rows = sample_data::demographics(25);
    let mut compare_rows = base_rows.clone();
    compare_rows[12][1] = json!(18);

    let base = fixture.create_dataset_json("dm.json", "DM", &columns, &base_rows).unwrap();
    let cmp = fixture.create_ndjson("dm.ndjson", "DM", &columns, &compare_rows).unwrap();

    let provider = FileProvider::new();
    let report = compare(
        &provider,
        DatasetHandle::new(base.to_string_lossy()),
        DatasetHandle::new(cmp.to_string_lossy()),
        CompareOptions::default(),
        StreamingSettings::new(10),
        &NoProgress,
    )
    .unwrap();

    assert!(!report.metadata_diff.has_changes());
    assert_eq!(report.summary.blocks_processed, 3);
    assert_eq!(report.summary.total_rows_checked, 25);
    assert_eq!(report.data_diff.modified_rows.len(), 1);
    assert_eq!(report.data_diff.modified_rows[0].row_base, 13);
    assert_eq!(report.data_diff.modified_rows[0].diff["AGE"], (json!(32), json!(18)));
}

#[test]
fn test_ndjson_windows() {
    let fixture = TestFixture::new().unwrap();
    let rows = sample_data::demographics(5);
    let path = fixture
        .create_ndjson("dm.ndjson", "DM", &sample_data::demographics_columns(), &rows)
        .unwrap();

    let provider = FileProvider::new();
    let handle = DatasetHandle::new(path.to_string_lossy());
    let meta = provider.metadata(&handle).unwrap();
    assert_eq!(meta.records, 5);
    assert_eq!(meta.columns.len(), 3);
    assert_eq!(provider.rows(&handle, 3, 10, None).unwrap(), rows[3..].to_vec());
    assert!(provider.rows(&handle, 5, 10, None).unwrap().is_empty());
}

#[test]
fn test_key_based_file_comparison() {
    let fixture = TestFixture::new().unwrap();
    let columns = sample_data::demographics_columns();
    let base_rows = sample_data::demographics(6);
    let mut compare_rows = base_rows.clone();
    compare_rows.swap(0, 5);
    compare_rows[0][2] = json!("U");

    let base = fixture.create_dataset_json("base.json", "DM", &columns, &base_rows).unwrap();
    let cmp = fixture.create_dataset_json("compare.json", "DM", &columns, &compare_rows).unwrap();

    let options = CompareOptions {
        id_columns: Some(vec!["USUBJID".to_string()]),
        ..Default::default()
    };
    let report = compare(
        &FileProvider::new(),
        DatasetHandle::new(base.to_string_lossy()),
        DatasetHandle::new(cmp.to_string_lossy()),
        options,
        StreamingSettings::default(),
        &NoProgress,
    )
    .unwrap();

    let modified = &report.data_diff.modified_rows;
    assert_eq!(modified.len(), 1);
    assert_eq!(modified[0].row_base, 6);
    assert_eq!(modified[0].row_compare, 1);
    assert_eq!(modified[0].diff["SEX"], (json!("M"), json!("U")));
}

#[test]
fn test_finished_job_releases_cached_datasets() {
    let fixture = TestFixture::new().unwrap();
    let columns = sample_data::demographics_columns();
    let rows = sample_data::demographics(12);
    let base = fixture.create_dataset_json("dm.json", "DM", &columns, &rows).unwrap();
    let cmp = fixture.create_ndjson("dm.ndjson", "DM", &columns, &rows).unwrap();

    let provider = DatasetJsonProvider::new();
    let report = compare(
        &provider,
        DatasetHandle::new(base.to_string_lossy()),
        DatasetHandle::new(cmp.to_string_lossy()),
        CompareOptions::default(),
        StreamingSettings::new(5),
        &NoProgress,
    )
    .unwrap();

    assert_eq!(report.summary.total_rows_checked, 12);
    assert_eq!(provider.cached_datasets(), 0);

    // A failed job releases too
    let err = compare(
        &provider,
        DatasetHandle::new(base.to_string_lossy()),
        DatasetHandle::new(fixture.root().join("missing.ndjson").to_string_lossy()),
        CompareOptions::default(),
        StreamingSettings::new(5),
        &NoProgress,
    )
    .unwrap_err();
    assert!(err.is_access());
    assert_eq!(provider.cached_datasets(), 0);
}
