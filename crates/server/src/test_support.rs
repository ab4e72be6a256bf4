// crates/server/src/test_support.rs
//! Shared fixtures for in-crate tests.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use clipfetch_core::{
    FetchError, FetchEvent, FetchRequest, MediaFetcher, MediaInfo, ReadinessProbe,
};

use crate::config::ServerConfig;
use crate::state::AppState;

/// Fetcher that "downloads" instantly: one `Finished` event, then a small
/// payload written at the expected output path.
pub(crate) struct StubFetcher;

#[async_trait]
impl MediaFetcher for StubFetcher {
    async fn probe(&self, _url: &str) -> Result<MediaInfo, FetchError> {
        Ok(MediaInfo {
            title: Some("Stub Title".to_string()),
            thumbnail: Some("https://example.com/thumb.jpg".to_string()),
        })
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        events: mpsc::UnboundedSender<FetchEvent>,
    ) -> Result<(), FetchError> {
        let _ = events.send(FetchEvent::Finished);
        tokio::fs::write(request.expected_output(), b"stub payload").await?;
        Ok(())
    }
}

/// Config rooted in a temp dir, with readiness polling fast enough that
/// tests never wait on real-time intervals.
pub(crate) fn test_config(download_dir: &Path) -> ServerConfig {
    ServerConfig {
        port: 0,
        download_dir: download_dir.to_path_buf(),
        static_dir: None,
        cookies_file: download_dir.join("cookies.txt"),
        ytdlp_bin: "yt-dlp".into(),
        readiness: ReadinessProbe::new(Duration::from_millis(10), Duration::from_millis(500)),
    }
}

pub(crate) fn test_state(download_dir: &Path) -> Arc<AppState> {
    AppState::new(&test_config(download_dir), Arc::new(StubFetcher))
}
