//! Failure modes: unreadable datasets, bad options, cancellation

use crate::common::{metadata, provider_pair, sample_data, TestFixture};
use dsdiff::orchestrator::{JobState, NoProgress};
use dsdiff::{
    compare, CancellationToken, CompareOptions, DataType, DatasetHandle, DiffError, DiffJob, FileProvider,
    StreamingSettings,
};
use serde_json::json;

fn file_compare(base: &str, cmp: &str, options: CompareOptions) -> dsdiff::Result<dsdiff::DiffReport> {
    compare(
        &FileProvider::new(),
        DatasetHandle::new(base),
        DatasetHandle::new(cmp),
        options,
        StreamingSettings::default(),
        &NoProgress,
    )
}

#[test]
fn test_missing_file_is_an_access_error() {
    let fixture = TestFixture::new().unwrap();
    let present = fixture
        .create_dataset_json("dm.json", "DM", &sample_data::demographics_columns(), &[])
        .unwrap();
    let missing = fixture.root().join("nope.json");

    let err = file_compare(&present.to_string_lossy(), &missing.to_string_lossy(), CompareOptions::default()).unwrap_err();
    assert!(err.is_access());
    assert!(err.to_string().contains("nope.json"));
}

#[test]
fn test_malformed_document_is_an_access_error() {
    let fixture = TestFixture::new().unwrap();
    let broken = fixture.create_raw("broken.json", "{\"columns\": [").unwrap();
    let path = broken.to_string_lossy();

    let err = file_compare(&path, &path, CompareOptions::default()).unwrap_err();
    assert!(err.is_access());
}

#[test]
fn test_unsupported_extension() {
    let err = file_compare("dm.txt", "dm.txt", CompareOptions::default()).unwrap_err();
    assert!(err.to_string().contains("unsupported dataset format"));
}

#[test]
fn test_filter_rejected_without_provider_support() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_dataset_json("dm.json", "DM", &sample_data::demographics_columns(), &sample_data::demographics(2))
        .unwrap();
    let path = path.to_string_lossy();

    let options = CompareOptions {
        base_filter: Some("AGE > 30".to_string()),
        ..Default::default()
    };
    let err = file_compare(&path, &path, options).unwrap_err();
    assert!(matches!(err, DiffError::Config { .. }));
}

#[test]
fn test_unknown_identifier_column() {
    let meta = metadata("DM", &[("USUBJID", DataType::String)]);
    let provider = provider_pair((meta.clone(), vec![vec![json!("S1")]]), (meta, vec![vec![json!("S1")]]));
    let options = CompareOptions {
        id_columns: Some(vec!["SUBJID".to_string()]),
        ..Default::default()
    };

    let err = compare(
        &provider,
        DatasetHandle::new("base"),
        DatasetHandle::new("compare"),
        options,
        StreamingSettings::default(),
        &NoProgress,
    )
    .unwrap_err();
    assert!(err.to_string().contains("SUBJID"));
}

#[test]
fn test_invalid_pattern_fails_before_reading() {
    let options = CompareOptions {
        ignore_pattern: Some("[".to_string()),
        ..Default::default()
    };
    // Neither file exists: validation must fail first
    let err = file_compare("a.json", "b.json", options).unwrap_err();
    assert!(matches!(err, DiffError::Config { .. }));
}

#[test]
fn test_cancelled_job_has_no_report() {
    let provider = provider_pair(
        (sample_data::demographics_metadata(), sample_data::demographics(10)),
        (sample_data::demographics_metadata(), sample_data::demographics(10)),
    );
    let token = CancellationToken::new();
    token.cancel();

    let mut job = DiffJob::new(
        &provider,
        DatasetHandle::new("base"),
        DatasetHandle::new("compare"),
        CompareOptions::default(),
        StreamingSettings::default(),
    )
    .with_cancellation(token);

    let err = job.run(&NoProgress).unwrap_err();
    assert!(matches!(err, DiffError::Cancelled));
    assert_eq!(job.state(), JobState::Failed);
}
