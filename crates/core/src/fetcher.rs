// crates/core/src/fetcher.rs
//! Abstraction over the external download/transcode tool.
//!
//! The job runner only ever talks to [`MediaFetcher`]; the yt-dlp adapter
//! lives in its own crate and tests substitute scripted implementations.
//! Progress flows over a channel rather than callbacks, so the runner owns
//! every store write and event handling needs no live tool to exercise.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::FetchError;
use crate::task::MediaKind;

/// Progress signals emitted by a fetcher while it works.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchEvent {
    /// Bytes are moving.
    Downloading {
        downloaded_bytes: u64,
        /// The tool's current belief about the transfer size. Absent for
        /// live or chunked sources that never announce one.
        total_bytes: Option<u64>,
        /// Transfer rate in bytes per second, when reported.
        speed: Option<f64>,
        /// Estimated seconds remaining, when reported.
        eta_secs: Option<u64>,
    },
    /// Transfer finished. Container merge or transcode may still be
    /// running inside the tool.
    Finished,
}

/// One fetch invocation: what to get and where to put it.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: String,
    pub kind: MediaKind,
    pub dest_dir: PathBuf,
    /// Filename stem, no extension. Minted fresh per job so concurrent
    /// tasks never collide on disk, even for the same URL.
    pub file_stem: String,
}

impl FetchRequest {
    /// Path the finished artifact is expected to land at.
    pub fn expected_output(&self) -> PathBuf {
        self.dest_dir.join(format!("{}.{}", self.file_stem, self.kind.extension()))
    }
}

/// Metadata from a probe, for client preview before committing to a
/// download.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaInfo {
    pub title: Option<String>,
    pub thumbnail: Option<String>,
}

/// Interface to the external media tool.
///
/// Implementations are shared across concurrent jobs behind an `Arc`.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetch metadata about `url` without downloading anything.
    async fn probe(&self, url: &str) -> Result<MediaInfo, FetchError>;

    /// Download (and transcode) per `request`, streaming progress into
    /// `events`. Resolves once the tool has fully exited. A closed events
    /// channel is not an error; implementations keep draining the tool to
    /// completion regardless.
    async fn fetch(
        &self,
        request: &FetchRequest,
        events: mpsc::UnboundedSender<FetchEvent>,
    ) -> Result<(), FetchError>;
}
