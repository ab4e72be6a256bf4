// crates/core/src/runner.rs
//! Single-job execution: drives one dispatched task to a terminal state.
//!
//! The runner is the only writer for its task id after the dispatcher's
//! seed write. Every exit path — unsupported kind, tool failure, missing
//! output, success — lands a terminal record in the store before `run`
//! returns, so a client polling the id can never be left hanging on a
//! non-terminal status once the job is gone.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::FetchError;
use crate::fetcher::{FetchEvent, FetchRequest, MediaFetcher};
use crate::readiness::ReadinessProbe;
use crate::store::ProgressStore;
use crate::task::{MediaKind, TaskId, TaskStatus};

// ============================================================================
// Percent folding
// ============================================================================

/// Folds raw byte counts into a published percent that never goes backward
/// and never reaches 100 before the terminal write.
#[derive(Debug, Clone, Copy)]
struct PercentTracker {
    last: u8,
}

impl PercentTracker {
    fn new() -> Self {
        // Matches the `starting` status percent.
        Self { last: 1 }
    }

    /// Fold one observation. A missing or zero total holds the previous
    /// value; multi-fragment downloads restart byte counts from zero, and
    /// the high-water mark keeps those restarts invisible to clients.
    fn observe(&mut self, downloaded: u64, total: Option<u64>) -> u8 {
        if let Some(total) = total.filter(|t| *t > 0) {
            let pct = (downloaded.saturating_mul(100) / total).min(99) as u8;
            if pct > self.last {
                self.last = pct;
            }
        }
        self.last
    }
}

// ============================================================================
// JobRunner
// ============================================================================

/// Everything one background job needs. Built by the dispatcher, consumed
/// by the spawned task.
pub struct JobRunner {
    store: ProgressStore,
    fetcher: Arc<dyn MediaFetcher>,
    probe: ReadinessProbe,
    dest_dir: PathBuf,
}

impl JobRunner {
    pub fn new(
        store: ProgressStore,
        fetcher: Arc<dyn MediaFetcher>,
        probe: ReadinessProbe,
        dest_dir: PathBuf,
    ) -> Self {
        Self { store, fetcher, probe, dest_dir }
    }

    /// Run the job to a terminal state and return the final filename.
    ///
    /// The terminal store write always happens before this returns; the
    /// `Result` exists for the spawn site's logging.
    pub async fn run(self, task_id: TaskId, url: String, kind: String) -> Result<String, FetchError> {
        self.store.set(&task_id, TaskStatus::starting());

        // Resolve the kind before anything touches the tool: a bad kind is
        // a terminal task error, not a tool invocation.
        let kind = match kind.parse::<MediaKind>() {
            Ok(kind) => kind,
            Err(e) => {
                self.store.set(&task_id, TaskStatus::failed(e.to_string()));
                return Err(e);
            }
        };

        let request = FetchRequest {
            url,
            kind,
            dest_dir: self.dest_dir.clone(),
            file_stem: uuid::Uuid::new_v4().to_string(),
        };
        tracing::info!(
            task_id = %task_id,
            kind = %kind,
            stem = %request.file_stem,
            "job started"
        );

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let fetch = self.fetcher.fetch(&request, events_tx);
        let fold = fold_events(&self.store, &task_id, events_rx);
        // Joining keeps event folding on this task and guarantees the
        // channel is fully drained before any terminal write below.
        let (outcome, ()) = tokio::join!(fetch, fold);

        if let Err(e) = outcome {
            self.store.set(&task_id, TaskStatus::failed(e.to_string()));
            return Err(e);
        }

        let output = request.expected_output();
        if !self.probe.wait_ready(&output).await {
            let e = FetchError::OutputMissing(file_name(&output));
            self.store.set(&task_id, TaskStatus::failed(e.to_string()));
            return Err(e);
        }

        let file = file_name(&output);
        self.store.set(&task_id, TaskStatus::done(file.clone()));
        Ok(file)
    }
}

/// Publish one snapshot per tool event until the channel closes.
async fn fold_events(
    store: &ProgressStore,
    task_id: &TaskId,
    mut events: mpsc::UnboundedReceiver<FetchEvent>,
) {
    let mut percent = PercentTracker::new();
    while let Some(event) = events.recv().await {
        match event {
            FetchEvent::Downloading { downloaded_bytes, total_bytes, speed, eta_secs } => {
                let pct = percent.observe(downloaded_bytes, total_bytes);
                store.set(task_id, TaskStatus::downloading(pct, speed, eta_secs));
            }
            FetchEvent::Finished => {
                store.set(task_id, TaskStatus::processing());
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}
