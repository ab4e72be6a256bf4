// crates/server/src/routes/files.rs
//! Finished-file retrieval.
//!
//! Serves completed downloads out of the download directory as streamed
//! attachment responses. Names are validated against path traversal, and
//! missing or still-empty files answer 404 so clients can treat "not
//! ready yet" and "never existed" the same way.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio_util::io::ReaderStream;

use crate::error::{ApiError, ApiResult};
use crate::metrics::record_file_served;
use crate::state::AppState;

/// Reject anything that could escape the download directory. Only plain
/// file names are ever produced by the job runner, so anything else is a
/// crafted request.
fn sanitize(name: &str) -> Result<(), ApiError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(ApiError::BadRequest("invalid file name".to_string()));
    }
    Ok(())
}

fn content_type(name: &str) -> &'static str {
    if name.ends_with(".mp4") {
        "video/mp4"
    } else if name.ends_with(".mp3") {
        "audio/mpeg"
    } else {
        "application/octet-stream"
    }
}

/// GET /api/files/{filename} - Stream a finished download.
pub async fn serve_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    sanitize(&filename)?;

    let path = state.download_dir.join(&filename);
    let meta = match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.len() > 0 => meta,
        _ => return Err(ApiError::FileNotFound(filename)),
    };

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| ApiError::FileNotFound(filename.clone()))?;

    let mime = content_type(&filename);
    record_file_served(mime);
    tracing::debug!(file = %filename, size = meta.len(), "serving download");

    let headers = [
        (CONTENT_TYPE, mime.to_string()),
        (CONTENT_LENGTH, meta.len().to_string()),
        (
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];
    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

/// Create the file retrieval router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/files/{filename}", get(serve_file))
}
