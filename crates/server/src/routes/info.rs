// crates/server/src/routes/info.rs
//! URL metadata probe.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::metrics::record_probe;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InfoRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct InfoResponse {
    pub title: String,
    /// Empty string when no thumbnail is known; the field is always
    /// present so clients can bind it unconditionally.
    pub thumbnail: String,
}

/// Title served when the probe fails. The download itself may still
/// succeed (age gates and rate limits often break metadata extraction
/// first), so clients get a preview card instead of an error.
const FALLBACK_TITLE: &str = "Media found (details unavailable)";

/// POST /api/info - Fetch title and thumbnail for a URL.
pub async fn probe_url(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InfoRequest>,
) -> ApiResult<Json<InfoResponse>> {
    if request.url.trim().is_empty() {
        return Err(ApiError::BadRequest("no URL provided".to_string()));
    }

    match state.fetcher.probe(&request.url).await {
        Ok(info) => {
            record_probe("ok");
            Ok(Json(InfoResponse {
                title: info.title.unwrap_or_else(|| FALLBACK_TITLE.to_string()),
                thumbnail: info.thumbnail.unwrap_or_default(),
            }))
        }
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "probe failed, serving placeholder");
            record_probe("degraded");
            Ok(Json(InfoResponse {
                title: FALLBACK_TITLE.to_string(),
                thumbnail: String::new(),
            }))
        }
    }
}

/// Create the info routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/info", post(probe_url))
}
