//! Command implementations for dsdiff CLI

use crate::cli::{CompareArgs, Commands, OutputFormat};
use crate::config::{CompareOptions, StreamingSettings};
use crate::error::{DiffError, Result};
use crate::metadata::MetadataComparator;
use crate::model::{DatasetHandle, StorageFamily};
use crate::output::{JsonFormatter, PrettyPrinter};
use crate::progress::ProgressReporter;
use crate::provider::{DatasetProvider, FileProvider};
use crate::task::spawn_compare;
use std::path::Path;
use std::sync::Arc;

/// Execute a command
pub fn execute_command(command: Commands) -> Result<()> {
    match command {
        Commands::Compare {
            base,
            compare,
            args,
            buffer_size,
            format,
            output,
            quiet,
        } => compare_command(&base, &compare, &args, buffer_size, &format, output.as_deref(), quiet),
        Commands::Metadata {
            base,
            compare,
            ignore_column_case,
            ignore_pattern,
            format,
        } => metadata_command(&base, &compare, ignore_column_case, ignore_pattern, &format),
    }
}

fn parse_format(format: &str) -> Result<OutputFormat> {
    OutputFormat::parse(format).map_err(DiffError::invalid_input)
}

/// Build job options from an optional options file overlaid with command-line flags
pub fn resolve_options(args: &CompareArgs) -> Result<CompareOptions> {
    let base = match &args.options {
        Some(path) => CompareOptions::from_json_file(path)?,
        None => CompareOptions::default(),
    };

    let flags = CompareOptions {
        id_columns: (!args.id_columns.is_empty()).then(|| args.id_columns.clone()),
        max_diff_count: args.max_diff_count,
        max_column_diff_count: args.max_column_diff_count,
        ignore_column_case: args.ignore_column_case,
        ignore_pattern: args.ignore_pattern.clone(),
        base_filter: args.base_filter.clone(),
        compare_filter: args.compare_filter.clone(),
        ..Default::default()
    };

    let mut options = base.merge(flags);
    if let Some(tolerance) = args.tolerance {
        options.tolerance = tolerance;
    }
    options.validate()?;
    Ok(options)
}

/// Compare two datasets and print or write the report
fn compare_command(
    base: &str,
    compare: &str,
    args: &CompareArgs,
    buffer_size: usize,
    format: &str,
    output: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    let format = parse_format(format)?;
    let options = resolve_options(args)?;
    let settings = StreamingSettings::new(buffer_size);

    let show_progress = !quiet && (output.is_some() || format == OutputFormat::Pretty);
    let mut reporter = if show_progress {
        ProgressReporter::new_for_compare()
    } else {
        ProgressReporter::new_minimal()
    };

    let job = spawn_compare(
        Arc::new(FileProvider::new()),
        DatasetHandle::new(base),
        DatasetHandle::new(compare),
        options,
        settings,
    );
    let report = job.wait_with_progress(|event| reporter.update(event));
    let report = match report {
        Ok(report) => {
            reporter.finish(&format!("{} differences", report.summary.total_diffs));
            report
        }
        Err(e) => {
            reporter.finish("failed");
            return Err(e);
        }
    };

    match (output, format) {
        (Some(path), format) => {
            let rendered = match format {
                OutputFormat::Json => JsonFormatter::format_report(&report)?,
                OutputFormat::Pretty => PrettyPrinter::render_report(&report, quiet),
            };
            std::fs::write(path, rendered)?;
            if !quiet {
                println!("📄 Report written to {}", path.display());
            }
        }
        (None, OutputFormat::Json) => println!("{}", JsonFormatter::format_report(&report)?),
        (None, OutputFormat::Pretty) => PrettyPrinter::print_report(&report, quiet),
    }

    Ok(())
}

/// Compare schemas only
fn metadata_command(
    base: &str,
    compare: &str,
    ignore_column_case: bool,
    ignore_pattern: Option<String>,
    format: &str,
) -> Result<()> {
    let format = parse_format(format)?;
    let options = CompareOptions {
        ignore_column_case,
        ignore_pattern,
        ..Default::default()
    };
    options.validate()?;

    let provider = FileProvider::new();
    let base = DatasetHandle::new(base);
    let compare = DatasetHandle::new(compare);
    let base_meta = provider.metadata(&base)?;
    let compare_meta = provider.metadata(&compare)?;

    let metadata_options = options.metadata_options(StorageFamily::is_cross_family(base.family, compare.family))?;
    let diff = MetadataComparator::new(&metadata_options)
        .compare(&base_meta, &compare_meta)
        .diff;

    match format {
        OutputFormat::Json => println!("{}", JsonFormatter::format(&diff)?),
        OutputFormat::Pretty => PrettyPrinter::print_metadata_diff(&diff),
    }
    Ok(())
}
