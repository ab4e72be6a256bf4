// crates/core/src/dispatch.rs
//! Task intake: validate, seed, spawn, return.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::FutureExt;

use crate::error::DispatchError;
use crate::fetcher::MediaFetcher;
use crate::readiness::ReadinessProbe;
use crate::runner::JobRunner;
use crate::store::ProgressStore;
use crate::task::{TaskId, TaskStatus};

/// Accepts download requests and turns each into a tracked background job.
///
/// [`dispatch`](Dispatcher::dispatch) does the cheap synchronous part
/// (validation, id mint, `queued` seed write) and returns before the job
/// has done any work. After the seed, the spawned job owns every store
/// write for its id.
#[derive(Clone)]
pub struct Dispatcher {
    store: ProgressStore,
    fetcher: Arc<dyn MediaFetcher>,
    dest_dir: PathBuf,
    probe: ReadinessProbe,
}

impl Dispatcher {
    pub fn new(
        store: ProgressStore,
        fetcher: Arc<dyn MediaFetcher>,
        dest_dir: impl Into<PathBuf>,
    ) -> Self {
        Self { store, fetcher, dest_dir: dest_dir.into(), probe: ReadinessProbe::default() }
    }

    /// Override readiness polling. Tests tighten the window; the server
    /// applies the configured timeout.
    pub fn with_probe(mut self, probe: ReadinessProbe) -> Self {
        self.probe = probe;
        self
    }

    /// Validate and launch. The returned id is immediately pollable because
    /// the seed write happens before this returns.
    ///
    /// The media kind is deliberately not validated here: an unsupported
    /// kind becomes a terminal `error` on the task, observable through the
    /// same progress interface as any other job failure.
    pub fn dispatch(&self, url: &str, kind: &str) -> Result<TaskId, DispatchError> {
        if url.trim().is_empty() {
            return Err(DispatchError::EmptyUrl);
        }

        let task_id = TaskId::new();
        self.store.set(&task_id, TaskStatus::queued());
        tracing::info!(task_id = %task_id, kind, "task dispatched");

        let runner = JobRunner::new(
            self.store.clone(),
            Arc::clone(&self.fetcher),
            self.probe,
            self.dest_dir.clone(),
        );
        let store = self.store.clone();
        let id = task_id.clone();
        let url = url.to_string();
        let kind = kind.to_string();

        tokio::spawn(async move {
            match AssertUnwindSafe(runner.run(id.clone(), url, kind)).catch_unwind().await {
                Ok(Ok(file)) => {
                    tracing::info!(task_id = %id, file = %file, "download job finished");
                }
                Ok(Err(e)) => {
                    tracing::warn!(task_id = %id, error = %e, "download job failed");
                }
                Err(panic) => {
                    // The runner writes its own terminal states; a panic is
                    // the one path where it cannot, so the record is
                    // finalized here instead of sticking at its last
                    // non-terminal status forever.
                    let msg = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!(task_id = %id, panic = %msg, "download job panicked");
                    store.set(&id, TaskStatus::failed(format!("internal error: {msg}")));
                }
            }
        });

        Ok(task_id)
    }

    /// Shared handle to the store this dispatcher seeds and its jobs write.
    pub fn store(&self) -> &ProgressStore {
        &self.store
    }
}
