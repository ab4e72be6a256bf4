// crates/server/src/routes/mod.rs
//! API route handlers for the clipfetch server.

pub mod download;
pub mod files;
pub mod health;
pub mod info;
pub mod metrics;
pub mod progress;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET  /api/health - Health check
/// - POST /api/info - Probe a URL for title and thumbnail
/// - POST /api/download/{kind} - Dispatch a download task (202 + task id)
/// - GET  /api/progress/{task_id} - Latest status snapshot for a task
/// - GET  /api/progress/{task_id}/stream - SSE stream of status changes
/// - GET  /api/tasks - Snapshot of all tracked tasks
/// - GET  /api/files/{filename} - Stream a finished download
/// - GET  /metrics - Prometheus metrics (no /api prefix)
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", info::router())
        .nest("/api", download::router())
        .nest("/api", progress::router())
        .nest("/api", files::router())
        .merge(metrics::router())
        .with_state(state)
}
