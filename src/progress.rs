//! Terminal progress for comparison jobs

use crate::orchestrator::ProgressEvent;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress display driven by job progress events
#[derive(Debug)]
pub struct ProgressReporter {
    pub setup_pb: Option<ProgressBar>,
    pub compare_pb: Option<ProgressBar>,
    show_progress: bool,
    last_issues: u64,
}

impl ProgressReporter {
    /// Create progress reporter for a comparison
    pub fn new_for_compare() -> Self {
        Self {
            setup_pb: Some(create_spinner("Reading metadata...")),
            compare_pb: None,
            show_progress: true,
            last_issues: 0,
        }
    }

    /// Create minimal progress reporter (no progress bars)
    pub fn new_minimal() -> Self {
        Self {
            setup_pb: None,
            compare_pb: None,
            show_progress: false,
            last_issues: 0,
        }
    }

    /// Lazily create the comparison bar on the first block
    fn ensure_compare_pb(&mut self) {
        if self.show_progress && self.compare_pb.is_none() {
            if let Some(pb) = self.setup_pb.take() {
                pb.finish_and_clear();
            }
            self.compare_pb = Some(create_progress_bar(100, "Comparing rows"));
        }
    }

    pub fn update(&mut self, event: ProgressEvent) {
        self.last_issues = event.issues_so_far;
        self.ensure_compare_pb();
        if let Some(pb) = &self.compare_pb {
            pb.set_position(event.progress as u64);
            pb.set_message(format!("{} differences", event.issues_so_far));
        }
    }

    pub fn issues_so_far(&self) -> u64 {
        self.last_issues
    }

    /// Finish all progress bars
    pub fn finish(&mut self, message: &str) {
        if let Some(pb) = self.setup_pb.take() {
            pb.finish_and_clear();
        }
        if let Some(pb) = self.compare_pb.take() {
            pb.set_position(100);
            pb.finish_with_message(message.to_string());
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Some(pb) = self.setup_pb.take() {
            pb.finish_and_clear();
        }
        if let Some(pb) = self.compare_pb.take() {
            pb.finish_and_clear();
        }
    }
}

/// Create a spinner progress bar
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Create a percentage bar
fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(message.to_string());
    pb
}
