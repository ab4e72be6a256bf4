// crates/server/src/routes/download.rs
//! Download dispatch endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::metrics::record_dispatch;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct DownloadAccepted {
    pub task_id: String,
}

/// POST /api/download/{kind} - Dispatch a background download task.
///
/// Replies 202 Accepted with the id to poll. Only an empty URL is an HTTP
/// error here; the kind segment passes through as-is, and an unsupported
/// kind surfaces as a terminal task error through the progress endpoints.
pub async fn dispatch_download(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Json(request): Json<DownloadRequest>,
) -> ApiResult<(StatusCode, Json<DownloadAccepted>)> {
    let task_id = state.dispatcher.dispatch(&request.url, &kind)?;
    record_dispatch(&kind);
    tracing::info!(task_id = %task_id, kind = %kind, "download accepted");

    Ok((StatusCode::ACCEPTED, Json(DownloadAccepted { task_id: task_id.to_string() })))
}

/// Create the download routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/download/{kind}", post(dispatch_download))
}
