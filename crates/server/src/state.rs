// crates/server/src/state.rs
//! Application state for the Axum server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clipfetch_core::{Dispatcher, MediaFetcher, ProgressStore};

use crate::config::ServerConfig;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Progress map shared with every background job.
    pub store: ProgressStore,
    /// Task intake; owns the spawn-and-track lifecycle.
    pub dispatcher: Dispatcher,
    /// The external tool, used directly for metadata probes.
    pub fetcher: Arc<dyn MediaFetcher>,
    /// Where finished artifacts are read from.
    pub download_dir: PathBuf,
}

impl AppState {
    /// Create application state wrapped in an Arc for sharing.
    ///
    /// The fetcher is injected so tests can substitute a scripted tool;
    /// the binary passes the yt-dlp adapter.
    pub fn new(config: &ServerConfig, fetcher: Arc<dyn MediaFetcher>) -> Arc<Self> {
        let store = ProgressStore::new();
        let dispatcher =
            Dispatcher::new(store.clone(), Arc::clone(&fetcher), config.download_dir.clone())
                .with_probe(config.readiness);

        Arc::new(Self {
            start_time: Instant::now(),
            store,
            dispatcher,
            fetcher,
            download_dir: config.download_dir.clone(),
        })
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
