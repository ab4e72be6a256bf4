// crates/core/src/readiness.rs
//! Output-file readiness detection.
//!
//! The external tool reports success before its artifact is necessarily
//! usable: fragments get merged, containers remuxed, buffers flushed. A
//! file counts as ready once it exists with a non-zero size that is
//! unchanged across two consecutive observations; a file that never
//! stabilizes before the deadline is treated as failed output.
//!
//! All timing goes through `tokio::time`, so paused-clock tests can drive
//! the loop deterministically.

use std::path::Path;
use std::time::Duration;

use tokio::time::{sleep, Instant};

/// How often the file is observed.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(300);
/// How long to keep observing before giving up.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(90);

/// Polling parameters for [`wait_ready`](ReadinessProbe::wait_ready).
#[derive(Debug, Clone, Copy)]
pub struct ReadinessProbe {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for ReadinessProbe {
    fn default() -> Self {
        Self { interval: DEFAULT_POLL_INTERVAL, timeout: DEFAULT_READY_TIMEOUT }
    }
}

impl ReadinessProbe {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Poll `path` until it is ready or the deadline passes.
    ///
    /// The deadline is checked before each observation, so an expired
    /// window never admits another poll. A vanished or truncated file
    /// resets the stability check; two consecutive equal non-zero sizes
    /// confirm readiness.
    pub async fn wait_ready(&self, path: &Path) -> bool {
        let deadline = Instant::now() + self.timeout;
        let mut last_size: Option<u64> = None;

        while Instant::now() < deadline {
            match tokio::fs::metadata(path).await {
                Ok(meta) if meta.len() > 0 => {
                    let size = meta.len();
                    if last_size == Some(size) {
                        tracing::debug!(path = %path.display(), size, "output file stable");
                        return true;
                    }
                    last_size = Some(size);
                }
                _ => last_size = None,
            }
            sleep(self.interval).await;
        }

        tracing::warn!(
            path = %path.display(),
            timeout_secs = self.timeout.as_secs(),
            "output file never became ready"
        );
        false
    }
}
