//! HTTP task service around the transformation pipeline.
//!
//! The service accepts a work id, runs the transformation on a blocking
//! worker, and hands the caller a task URL to poll: `POST /v1/texts/{wid}`
//! answers 202 with a `Location` header, `GET /tasks/{task_id}` answers 202
//! while the task runs and the recorded result afterwards. A background
//! sweeper evicts task records five minutes after completion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::Error;
use crate::factory::transform;
use crate::settings::FactorySettings;

/// How long finished task records are kept around for polling.
const TASK_RETENTION: Duration = Duration::from_secs(5 * 60);
/// Sweep interval of the eviction task.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct TaskRecord {
    /// Set when the task has finished, successfully or not.
    finished_at: Option<Instant>,
    result: Option<TaskResult>,
}

enum TaskResult {
    Done(serde_json::Value),
    Failed { status: StatusCode, message: String },
}

#[derive(Clone)]
struct AppState {
    settings: Arc<FactorySettings>,
    tasks: Arc<Mutex<HashMap<String, TaskRecord>>>,
}

/// Starts the service and blocks until it shuts down.
pub async fn serve(settings: FactorySettings) -> Result<(), Box<dyn std::error::Error>> {
    let port = settings.port;
    let addr = format!("0.0.0.0:{port}");
    let state = AppState {
        settings: Arc::new(settings),
        tasks: Arc::new(Mutex::new(HashMap::new())),
    };

    // sweep finished tasks so the map cannot grow without bound
    let sweeper_tasks = state.tasks.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(SWEEP_INTERVAL).await;
            let mut tasks = sweeper_tasks.lock().expect("task map lock");
            tasks.retain(|_, record| match record.finished_at {
                Some(finished_at) => finished_at.elapsed() < TASK_RETENTION,
                None => true,
            });
        }
    });

    let app = Router::new()
        .route("/v1/texts/{wid}", post(start_transform))
        .route("/tasks/{task_id}", get(task_status))
        .with_state(state);

    println!("Serving factory at http://localhost:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Accepts a transformation request and returns the task URL to poll.
async fn start_transform(
    Path(wid): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let task_id = format!("{:032x}", fastrand::u128(..));
    state.tasks.lock().expect("task map lock").insert(
        task_id.clone(),
        TaskRecord {
            finished_at: None,
            result: None,
        },
    );

    let tasks = state.tasks.clone();
    let settings = state.settings.clone();
    let worker_task_id = task_id.clone();
    tokio::task::spawn_blocking(move || {
        let result = match transform(&wid, &settings) {
            Ok(outcome) => TaskResult::Done(json!(outcome)),
            Err(e) => TaskResult::Failed {
                status: error_status(&e),
                message: e.to_string(),
            },
        };
        let mut tasks = tasks.lock().expect("task map lock");
        if let Some(record) = tasks.get_mut(&worker_task_id) {
            record.finished_at = Some(Instant::now());
            record.result = Some(result);
        }
    });

    let mut headers = HeaderMap::new();
    let location = format!("/tasks/{task_id}");
    headers.insert(
        header::LOCATION,
        location.parse().expect("task URL is a valid header value"),
    );
    (StatusCode::ACCEPTED, headers, Json(json!({ "status": "accepted" }))).into_response()
}

/// Reports a task: 202 while pending, the recorded result afterwards.
async fn task_status(
    Path(task_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let tasks = state.tasks.lock().expect("task map lock");
    let Some(record) = tasks.get(&task_id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no such task" })),
        )
            .into_response();
    };
    match &record.result {
        None => (
            StatusCode::ACCEPTED,
            Json(json!({ "status": "still_processing" })),
        )
            .into_response(),
        Some(TaskResult::Done(outcome)) => {
            (StatusCode::OK, Json(outcome.clone())).into_response()
        }
        Some(TaskResult::Failed { status, message }) => {
            (*status, Json(json!({ "error": message }))).into_response()
        }
    }
}

fn error_status(error: &Error) -> StatusCode {
    match error {
        Error::QueryValidation(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_validation_maps_to_not_found() {
        let error = Error::QueryValidation("W9999".to_string());
        assert_eq!(error_status(&error), StatusCode::NOT_FOUND);
        let error = Error::markup("boom");
        assert_eq!(error_status(&error), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
