//! Block-by-block driver of a comparison job

use crate::accumulator::{DiffAccumulator, DiffReport};
use crate::config::{CompareOptions, StreamingSettings};
use crate::error::{DiffError, Result};
use crate::metadata::MetadataComparator;
use crate::model::{DatasetHandle, Row, StorageFamily};
use crate::provider::DatasetProvider;
use crate::rows::{BlockDiff, RowMatcher, RunningState};
use crate::transform::CrossFormatTransformer;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Progress notification emitted after every block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// 0-99 while running; 100 is implied by the final result
    pub progress: u8,
    pub issues_so_far: u64,
}

/// Receiver of progress notifications. Implementations must not block.
pub trait ProgressSink {
    fn on_progress(&self, event: ProgressEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _event: ProgressEvent) {}
}

impl<F: Fn(ProgressEvent)> ProgressSink for F {
    fn on_progress(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Cooperative cancellation flag checked between blocks
#[derive(Debug, Default, Clone)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lifecycle of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Init,
    FetchingMetadata,
    Comparing { block: u64 },
    Finalizing,
    Done,
    Failed,
}

/// One comparison between a base and a compare dataset
pub struct DiffJob<'p, P: DatasetProvider + ?Sized> {
    provider: &'p P,
    base: DatasetHandle,
    compare: DatasetHandle,
    options: CompareOptions,
    settings: StreamingSettings,
    cancel: CancellationToken,
    state: JobState,
}

impl<'p, P: DatasetProvider + ?Sized> DiffJob<'p, P> {
    pub fn new(
        provider: &'p P,
        base: DatasetHandle,
        compare: DatasetHandle,
        options: CompareOptions,
        settings: StreamingSettings,
    ) -> Self {
        Self {
            provider,
            base,
            compare,
            options,
            settings,
            cancel: CancellationToken::new(),
            state: JobState::Init,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Run the job to completion. Any error leaves the job `Failed` with no partial report.
    pub fn run(&mut self, sink: &dyn ProgressSink) -> Result<DiffReport> {
        self.state = JobState::Init;
        let outcome = self.execute(sink);
        self.provider.release(&self.base);
        self.provider.release(&self.compare);
        match outcome {
            Ok(report) => {
                self.state = JobState::Done;
                Ok(report)
            }
            Err(e) => {
                log::debug!("Comparison of {} and {} failed: {}", self.base, self.compare, e);
                self.state = JobState::Failed;
                Err(e)
            }
        }
    }

    fn validate(&self) -> Result<()> {
        self.options.validate()?;
        self.settings.validate()?;

        let filters = [
            (&self.base, self.options.base_filter.as_deref()),
            (&self.compare, self.options.compare_filter.as_deref()),
        ];
        for (handle, filter) in filters {
            if filter.is_some() && !self.provider.supports_filter(handle) {
                return Err(DiffError::config(format!(
                    "Row filters are not supported for dataset '{}'",
                    handle
                )));
            }
        }
        Ok(())
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            log::info!("Comparison of {} and {} cancelled", self.base, self.compare);
            return Err(DiffError::Cancelled);
        }
        Ok(())
    }

    fn fetch(&self, handle: &DatasetHandle, filter: Option<&str>, start: u64, transformer: Option<&CrossFormatTransformer>) -> Result<Vec<Row>> {
        let mut rows = self.provider.rows(handle, start, self.settings.buffer_size, filter)?;
        if let Some(transformer) = transformer {
            transformer.transform_rows(&mut rows);
        }
        Ok(rows)
    }

    fn execute(&mut self, sink: &dyn ProgressSink) -> Result<DiffReport> {
        self.validate()?;

        self.state = JobState::FetchingMetadata;
        let base_meta = self.provider.metadata(&self.base)?;
        let compare_meta = self.provider.metadata(&self.compare)?;

        let cross_family = StorageFamily::is_cross_family(self.base.family, self.compare.family);
        let metadata_options = self.options.metadata_options(cross_family)?;
        let comparison = MetadataComparator::new(&metadata_options).compare(&base_meta, &compare_meta);

        let matcher = RowMatcher::new(
            comparison.pairs,
            &self.options.match_strategy(),
            &metadata_options,
            self.options.tolerance,
            self.options.max_column_diff_count,
        )?;

        let transformers = cross_family.then(|| {
            (
                CrossFormatTransformer::new(&base_meta.columns),
                CrossFormatTransformer::new(&compare_meta.columns),
            )
        });
        let (base_tf, compare_tf) = match &transformers {
            Some((b, c)) => (Some(b), Some(c)),
            None => (None, None),
        };

        let paired = base_meta.records.min(compare_meta.records);
        let total_rows = if matcher.is_positional() {
            base_meta.records.max(compare_meta.records)
        } else {
            paired
        };
        let step = self.settings.buffer_size as u64;

        log::info!(
            "Comparing {} ({} rows) with {} ({} rows), {} common columns{}",
            self.base,
            base_meta.records,
            self.compare,
            compare_meta.records,
            matcher.pairs().len(),
            if cross_family { ", cross-format" } else { "" }
        );

        let mut acc = DiffAccumulator::new(total_rows, self.options.max_diff_count);
        let mut running = RunningState::default();
        let base_filter = self.options.base_filter.clone();
        let compare_filter = self.options.compare_filter.clone();

        let mut start = 0u64;
        let mut block = 0u64;
        while start < paired && !acc.max_diff_reached() {
            self.check_cancelled()?;
            self.state = JobState::Comparing { block };

            let base_rows = self.fetch(&self.base, base_filter.as_deref(), start, base_tf)?;
            let compare_rows = self.fetch(&self.compare, compare_filter.as_deref(), start, compare_tf)?;
            if base_rows.is_empty() && compare_rows.is_empty() {
                break;
            }

            let diff = matcher.compare_block(&base_rows, &compare_rows, &mut running, start);
            log::debug!(
                "Block {} at row {}: {} modified rows",
                block,
                start + 1,
                diff.data.modified_rows.len()
            );
            acc.merge_block(diff);
            self.emit(sink, &acc);

            start += step;
            block += 1;
        }

        // Surplus rows of the longer dataset, positional mode only
        if matcher.is_positional() && base_meta.records != compare_meta.records {
            let added = compare_meta.records > base_meta.records;
            let (handle, filter, records, transformer) = if added {
                (&self.compare, compare_filter.as_deref(), compare_meta.records, compare_tf)
            } else {
                (&self.base, base_filter.as_deref(), base_meta.records, base_tf)
            };

            let mut start = paired;
            while start < records && !acc.max_diff_reached() {
                self.check_cancelled()?;
                self.state = JobState::Comparing { block };

                let rows = self.fetch(handle, filter, start, transformer)?;
                if rows.is_empty() {
                    break;
                }
                acc.merge_block(BlockDiff::unmatched(rows, added, start));
                self.emit(sink, &acc);

                start += step;
                block += 1;
            }
        }

        self.check_cancelled()?;
        self.state = JobState::Finalizing;
        let report = acc.finish(comparison.diff);

        log::info!(
            "Comparison finished: {} blocks, {} rows checked, {} differences{}",
            report.summary.blocks_processed,
            report.summary.total_rows_checked,
            report.summary.total_diffs,
            if report.summary.max_diff_reached { " (limit reached)" } else { "" }
        );

        Ok(report)
    }

    fn emit(&self, sink: &dyn ProgressSink, acc: &DiffAccumulator) {
        sink.on_progress(ProgressEvent {
            progress: acc.percent(),
            issues_so_far: acc.summary().total_diffs,
        });
    }
}

/// Compare two datasets synchronously
pub fn compare<P: DatasetProvider + ?Sized>(
    provider: &P,
    base: DatasetHandle,
    compare: DatasetHandle,
    options: CompareOptions,
    settings: StreamingSettings,
    sink: &dyn ProgressSink,
) -> Result<DiffReport> {
    DiffJob::new(provider, base, compare, options, settings).run(sink)
}
