// crates/server/src/lib.rs
//! Clipfetch server library.
//!
//! This crate provides the Axum-based HTTP server for the clipfetch
//! downloader. It serves a REST API for dispatching media download tasks,
//! polling and streaming their progress, and retrieving finished files.

pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::ServerConfig;
pub use error::*;
pub use metrics::{init_metrics, render_metrics};
pub use routes::api_routes;
pub use state::AppState;

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes (health, info, download, progress, files) plus /metrics
/// - CORS for development (allows any origin)
/// - Request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    with_middleware(Router::new().merge(api_routes(state)))
}

/// Same app, with non-API paths falling through to a static frontend
/// directory.
pub fn create_app_with_static(state: Arc<AppState>, static_dir: &Path) -> Router {
    with_middleware(
        Router::new().merge(api_routes(state)).fallback_service(ServeDir::new(static_dir)),
    )
}

fn with_middleware(router: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router.layer(cors).layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    /// Helper to make a GET request to the app.
    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body_str = String::from_utf8(body.to_vec()).unwrap();

        (status, body_str)
    }

    /// Helper to POST a JSON body to the app.
    async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> (StatusCode, String) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body_str = String::from_utf8(body.to_vec()).unwrap();

        (status, body_str)
    }

    // ========================================================================
    // Health Endpoint Tests
    // ========================================================================

    #[tokio::test]
    async fn test_health_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_app(test_state(dir.path()));
        let (status, body) = get(app, "/api/health").await;

        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert!(json["version"].is_string());
        assert!(json["uptime_secs"].is_number());
        assert_eq!(json["tasks_tracked"], 0);
    }

    // ========================================================================
    // Dispatch Endpoint Tests
    // ========================================================================

    #[tokio::test]
    async fn test_dispatch_returns_task_id() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_app(test_state(dir.path()));

        let (status, body) = post_json(
            app,
            "/api/download/video",
            serde_json::json!({"url": "https://example.com/watch?v=abc"}),
        )
        .await;

        assert_eq!(status, StatusCode::ACCEPTED);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(json["task_id"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[tokio::test]
    async fn test_dispatch_rejects_empty_url() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_app(test_state(dir.path()));

        let (status, body) =
            post_json(app, "/api/download/video", serde_json::json!({"url": "  "})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"], "no URL provided");
    }

    #[tokio::test]
    async fn test_dispatch_rejects_missing_url_field() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_app(test_state(dir.path()));

        let (status, _body) = post_json(app, "/api/download/audio", serde_json::json!({})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // ========================================================================
    // Progress Endpoint Tests
    // ========================================================================

    #[tokio::test]
    async fn test_unknown_task_gets_pollable_record() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_app(test_state(dir.path()));
        let (status, body) = get(app, "/api/progress/never-dispatched").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json, serde_json::json!({"status": "unknown", "percent": 0}));
    }

    #[tokio::test]
    async fn test_task_listing_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_app(test_state(dir.path()));
        let (status, body) = get(app, "/api/tasks").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json, serde_json::json!([]));
    }

    // ========================================================================
    // File Endpoint Tests
    // ========================================================================

    #[tokio::test]
    async fn test_file_name_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_app(test_state(dir.path()));
        let (status, body) = get(app, "/api/files/..%2F..%2Fetc%2Fpasswd").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"], "invalid file name");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_app(test_state(dir.path()));
        let (status, body) = get(app, "/api/files/nope.mp4").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(json.get("error").is_some());
    }

    // ========================================================================
    // CORS Tests
    // ========================================================================

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_app(test_state(dir.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header("Origin", "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let allow_origin = response.headers().get("access-control-allow-origin");
        assert!(allow_origin.is_some());
        assert_eq!(allow_origin.unwrap(), "*");
    }

    // ========================================================================
    // Routing Tests
    // ========================================================================

    #[tokio::test]
    async fn test_404_for_unknown_route() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_app(test_state(dir.path()));
        let (status, _body) = get(app, "/api/nonexistent").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_root_is_404_without_static_dir() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_app(test_state(dir.path()));
        let (status, _body) = get(app, "/").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_static_fallback_serves_frontend() {
        let dir = tempfile::tempdir().unwrap();
        let frontend = dir.path().join("static");
        std::fs::create_dir(&frontend).unwrap();
        std::fs::write(frontend.join("index.html"), "<html>clipfetch</html>").unwrap();

        let app = create_app_with_static(test_state(dir.path()), &frontend);

        let (status, body) = get(app.clone(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("clipfetch"));

        // API routes still win over the fallback.
        let (status, _body) = get(app, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
    }
}
