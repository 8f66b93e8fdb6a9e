//! Unit tests for CLI argument parsing and option resolution

use clap::Parser;
use dsdiff::cli::{Cli, Commands, OutputFormat};
use dsdiff::commands::resolve_options;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_cli_compare_defaults() {
    let cli = Cli::try_parse_from(["dsdiff", "compare", "dm.json", "dm.xpt"]).unwrap();
    match cli.command {
        Commands::Compare {
            base,
            compare,
            args,
            buffer_size,
            format,
            output,
            quiet,
        } => {
            assert_eq!(base, "dm.json");
            assert_eq!(compare, "dm.xpt");
            assert_eq!(buffer_size, 10000);
            assert_eq!(format, "pretty");
            assert!(output.is_none());
            assert!(!quiet);
            assert!(args.id_columns.is_empty());
            assert!(args.tolerance.is_none());
        }
        _ => panic!("Expected Compare command"),
    }
}

#[test]
fn test_cli_compare_with_options() {
    let cli = Cli::try_parse_from([
        "dsdiff",
        "compare",
        "a.json",
        "b.json",
        "--id-column",
        "STUDYID",
        "--id-column",
        "USUBJID",
        "--tolerance",
        "0.001",
        "--max-diff-count",
        "50",
        "--ignore-column-case",
        "--buffer-size",
        "500",
        "--format",
        "json",
    ])
    .unwrap();

    match cli.command {
        Commands::Compare {
            args,
            buffer_size,
            format,
            ..
        } => {
            assert_eq!(args.id_columns, vec!["STUDYID", "USUBJID"]);
            assert_eq!(args.tolerance, Some(0.001));
            assert_eq!(args.max_diff_count, Some(50));
            assert!(args.ignore_column_case);
            assert_eq!(buffer_size, 500);
            assert_eq!(OutputFormat::parse(&format), Ok(OutputFormat::Json));
        }
        _ => panic!("Expected Compare command"),
    }
}

#[test]
fn test_cli_rejects_zero_buffer_size() {
    let result = Cli::try_parse_from(["dsdiff", "compare", "a.json", "b.json", "--buffer-size", "0"]);
    assert!(result.is_err());
}

#[test]
fn test_cli_metadata_command() {
    let cli = Cli::try_parse_from(["dsdiff", "metadata", "a.json", "b.json", "--ignore-pattern", "^_"]).unwrap();
    match cli.command {
        Commands::Metadata {
            ignore_pattern,
            ignore_column_case,
            ..
        } => {
            assert_eq!(ignore_pattern.as_deref(), Some("^_"));
            assert!(!ignore_column_case);
        }
        _ => panic!("Expected Metadata command"),
    }
}

#[test]
fn test_cli_verbose_flag_is_global() {
    let cli = Cli::try_parse_from(["dsdiff", "metadata", "a.json", "b.json", "--verbose"]).unwrap();
    assert!(cli.verbose);
}

#[test]
fn test_flags_override_options_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("options.json");
    fs::write(
        &path,
        r#"{"tolerance": 0.5, "idColumns": ["USUBJID"], "maxDiffCount": 10, "ignorePattern": "^_"}"#,
    )
    .unwrap();

    let options_arg = path.to_str().unwrap().to_string();
    let cli = Cli::try_parse_from([
        "dsdiff",
        "compare",
        "a.json",
        "b.json",
        "--options",
        options_arg.as_str(),
        "--max-diff-count",
        "99",
    ])
    .unwrap();

    let Commands::Compare { args, .. } = cli.command else {
        panic!("Expected Compare command");
    };
    let options = resolve_options(&args).unwrap();
    assert_eq!(options.tolerance, 0.5);
    assert_eq!(options.id_columns, Some(vec!["USUBJID".to_string()]));
    assert_eq!(options.max_diff_count, Some(99));
    assert_eq!(options.ignore_pattern.as_deref(), Some("^_"));
}

#[test]
fn test_resolve_options_rejects_bad_pattern() {
    let cli = Cli::try_parse_from(["dsdiff", "compare", "a.json", "b.json", "--ignore-pattern", "(unclosed"]).unwrap();
    let Commands::Compare { args, .. } = cli.command else {
        panic!("Expected Compare command");
    };
    let err = resolve_options(&args).unwrap_err();
    assert!(err.to_string().contains("ignorePattern"));
}
