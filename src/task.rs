//! Comparison jobs on a background thread, reporting through a channel

use crate::accumulator::DiffReport;
use crate::config::{CompareOptions, StreamingSettings};
use crate::error::{DiffError, Result};
use crate::model::DatasetHandle;
use crate::orchestrator::{CancellationToken, DiffJob, ProgressEvent, ProgressSink};
use crate::provider::DatasetProvider;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Messages from a running job: any number of progress events, then one terminal event
#[derive(Debug)]
pub enum JobEvent {
    Progress(ProgressEvent),
    Completed(Box<DiffReport>),
    Failed(String),
}

impl JobEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}

struct ChannelSink {
    sender: Sender<JobEvent>,
}

impl ProgressSink for ChannelSink {
    fn on_progress(&self, event: ProgressEvent) {
        // Unbounded send never blocks; a gone receiver only loses the update
        let _ = self.sender.send(JobEvent::Progress(event));
    }
}

/// Handle to a job running on its own thread
pub struct JobHandle {
    events: Receiver<JobEvent>,
    cancel: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl JobHandle {
    pub fn events(&self) -> &Receiver<JobEvent> {
        &self.events
    }

    /// Ask the job to stop before its next block
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Block until the terminal event, calling `on_progress` for each progress event
    pub fn wait_with_progress(mut self, mut on_progress: impl FnMut(ProgressEvent)) -> Result<DiffReport> {
        let outcome = loop {
            match self.events.recv() {
                Ok(JobEvent::Progress(event)) => on_progress(event),
                Ok(JobEvent::Completed(report)) => break Ok(*report),
                Ok(JobEvent::Failed(error)) => break Err(DiffError::Generic(anyhow::anyhow!(error))),
                Err(_) => break Err(DiffError::Generic(anyhow::anyhow!("comparison job ended without a result"))),
            }
        };
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        outcome
    }

    pub fn wait(self) -> Result<DiffReport> {
        self.wait_with_progress(|_| {})
    }
}

/// Start a comparison on a dedicated thread
pub fn spawn_compare<P>(
    provider: Arc<P>,
    base: DatasetHandle,
    compare: DatasetHandle,
    options: CompareOptions,
    settings: StreamingSettings,
) -> JobHandle
where
    P: DatasetProvider + ?Sized + 'static,
{
    let (sender, events) = mpsc::channel();
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let thread = thread::spawn(move || {
        let sink = ChannelSink { sender };
        let mut job = DiffJob::new(provider.as_ref(), base, compare, options, settings).with_cancellation(token);
        let terminal = match job.run(&sink) {
            Ok(report) => JobEvent::Completed(Box::new(report)),
            Err(e) => JobEvent::Failed(e.to_string()),
        };
        let _ = sink.sender.send(terminal);
    });

    JobHandle {
        events,
        cancel,
        thread: Some(thread),
    }
}
