// crates/server/src/main.rs
//! Clipfetch server binary.
//!
//! Reads configuration from the environment, checks that yt-dlp is
//! reachable (a missing tool is logged, not fatal), and serves the API
//! plus an optional static frontend.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use clipfetch_server::{create_app, create_app_with_static, init_metrics, AppState, ServerConfig};
use clipfetch_ytdlp::YtDlpFetcher;

#[tokio::main]
async fn main() -> Result<()> {
    // Structured logs; RUST_LOG overrides the default level.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .compact()
        .init();

    let config = ServerConfig::from_env();

    // Initialize Prometheus metrics
    init_metrics();

    eprintln!("\n\u{1f3ac} clipfetch v{}\n", env!("CARGO_PKG_VERSION"));

    // Step 1: Make sure finished downloads have somewhere to land
    tokio::fs::create_dir_all(&config.download_dir).await?;

    // Step 2: Wire up the yt-dlp adapter and check it is callable
    let fetcher = Arc::new(
        YtDlpFetcher::new()
            .with_binary(&config.ytdlp_bin)
            .with_cookies_file(&config.cookies_file),
    );
    match fetcher.version().await {
        Ok(version) => tracing::info!(%version, "download tool available"),
        Err(e) => tracing::warn!(
            error = %e,
            "yt-dlp not available; downloads will fail until it is installed"
        ),
    }

    // Step 3: Build shared state and the Axum app
    let state = AppState::new(&config, fetcher);
    let app = match &config.static_dir {
        Some(dir) => create_app_with_static(state, dir),
        None => create_app(state),
    };

    // Step 4: Bind and serve
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    eprintln!("  \u{2713} Downloads: {}", config.download_dir.display());
    eprintln!("  \u{2192} http://localhost:{}\n", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
