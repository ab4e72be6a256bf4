// crates/server/src/routes/progress.rs
//! Task progress: polling snapshot, task listing, and SSE stream.
//!
//! Polling is the canonical interface (the store answers instantly from
//! memory); the SSE stream is a convenience that re-polls server-side and
//! pushes changes, ending itself at the terminal snapshot.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use clipfetch_core::TaskStatus;

use crate::state::AppState;

/// How often the SSE stream re-checks the store.
const STREAM_POLL: Duration = Duration::from_millis(250);
/// Upper bound on one stream's lifetime. Pollers have no such bound, so a
/// download that outlives this just means the client falls back to
/// polling.
const STREAM_MAX_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// Not-found-shaped record for ids this process has never seen (or a
/// restarted process has forgotten). Clients poll immediately after
/// dispatch, so this is a 200 with a pollable shape rather than a 404.
#[derive(Debug, Serialize)]
struct UnknownTask {
    status: &'static str,
    percent: u8,
}

fn unknown_task() -> UnknownTask {
    UnknownTask { status: "unknown", percent: 0 }
}

/// GET /api/progress/{task_id} - Latest snapshot for one task.
pub async fn task_progress(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Response {
    match state.store.get(&task_id) {
        Some(status) => Json(status).into_response(),
        None => Json(unknown_task()).into_response(),
    }
}

/// One row of the task listing: the id plus its status record, flattened
/// to the same shape the single-task endpoint returns.
#[derive(Debug, Serialize)]
pub struct TaskSummary {
    pub task_id: String,
    #[serde(flatten)]
    pub status: TaskStatus,
}

/// GET /api/tasks - Snapshot of every task this process has dispatched.
pub async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<Vec<TaskSummary>> {
    let mut tasks: Vec<TaskSummary> = state
        .store
        .snapshot()
        .into_iter()
        .map(|(id, status)| TaskSummary { task_id: id.to_string(), status })
        .collect();
    tasks.sort_by(|a, b| a.task_id.cmp(&b.task_id));
    Json(tasks)
}

/// GET /api/progress/{task_id}/stream - SSE stream of status changes.
///
/// Emits a `progress` event for each observed change, the terminal
/// snapshot last, then closes. Unknown ids emit the unknown record once
/// and close immediately.
pub async fn stream_progress(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        let started = tokio::time::Instant::now();
        let mut last: Option<TaskStatus> = None;

        loop {
            match state.store.get(&task_id) {
                None => {
                    let data = serde_json::to_string(&unknown_task()).unwrap_or_default();
                    yield Ok(Event::default().event("progress").data(data));
                    break;
                }
                Some(status) => {
                    if last.as_ref() != Some(&status) {
                        let data = serde_json::to_string(&status).unwrap_or_default();
                        yield Ok(Event::default().event("progress").data(data));
                        let terminal = status.is_terminal();
                        last = Some(status);
                        if terminal {
                            break;
                        }
                    }
                }
            }

            if started.elapsed() > STREAM_MAX_LIFETIME {
                tracing::warn!(task_id = %task_id, "progress stream hit its lifetime cap");
                break;
            }
            tokio::time::sleep(STREAM_POLL).await;
        }
    };

    Sse::new(stream).keep_alive(axum::response::sse::KeepAlive::default())
}

/// Create the progress routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/progress/{task_id}", get(task_progress))
        .route("/progress/{task_id}/stream", get(stream_progress))
        .route("/tasks", get(list_tasks))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn unknown_record_has_the_well_known_shape() {
        assert_eq!(
            serde_json::to_value(unknown_task()).unwrap(),
            json!({"status": "unknown", "percent": 0})
        );
    }

    #[test]
    fn task_summary_flattens_the_status_record() {
        let summary = TaskSummary {
            task_id: "id-1".into(),
            status: TaskStatus::downloading(40, None, Some(9)),
        };
        assert_eq!(
            serde_json::to_value(summary).unwrap(),
            json!({"task_id": "id-1", "status": "downloading", "percent": 40, "eta": 9})
        );
    }
}
