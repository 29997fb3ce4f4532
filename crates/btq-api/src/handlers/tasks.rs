//! Task submission and worker exchange handlers.
//!
//! - `POST /api/submit-task` queues a new video
//! - `GET /api/get-pending-task` hands the oldest pending task to a worker
//! - `POST /api/get-pending-task` records the worker's result or error

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use btq_models::{Task, TaskId, TaskOutcome, TaskStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTaskRequest {
    #[serde(default)]
    pub video_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTaskResponse {
    pub success: bool,
    pub task_id: TaskId,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ClaimQuery {
    /// Worker host name, logged with the claim
    #[serde(default)]
    pub worker_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PendingTaskResponse {
    pub task: Option<Task>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct UpdateTaskResponse {
    pub success: bool,
    pub message: String,
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::invalid_request(rejection.body_text()))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/submit-task
///
/// Returns:
/// - 200: `{ success, taskId, message }`
/// - 400: missing or unrecognised video URL
/// - 500: store failure (the task may be partially written)
pub async fn submit_task(
    State(state): State<AppState>,
    payload: Result<Json<SubmitTaskRequest>, JsonRejection>,
) -> ApiResult<Json<SubmitTaskResponse>> {
    let request = json_body(payload)?;

    let video_url = request
        .video_url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::invalid_request("Video URL is required"))?;

    let task = state
        .queue
        .submit(&video_url)
        .await
        .map_err(|e| ApiError::from_queue("Failed to submit task", e))?;

    metrics::record_task_submitted();

    Ok(Json(SubmitTaskResponse {
        success: true,
        task_id: task.task_id,
        message: "Task submitted successfully".to_string(),
    }))
}

/// GET /api/get-pending-task
///
/// An empty queue is not an error: the response is `{ "task": null }`.
/// A query string that does not parse only loses the worker id.
pub async fn get_pending_task(
    State(state): State<AppState>,
    query: Result<Query<ClaimQuery>, QueryRejection>,
) -> ApiResult<Json<PendingTaskResponse>> {
    let worker_id = query.ok().and_then(|Query(q)| q.worker_id);

    let task = state
        .queue
        .claim()
        .await
        .map_err(|e| ApiError::from_queue("Failed to get pending task", e))?;

    match &task {
        Some(task) => {
            info!(
                task_id = %task.task_id,
                worker_id = worker_id.as_deref().unwrap_or("unknown"),
                "Task handed to worker"
            );
            metrics::record_task_claimed();
        }
        None => metrics::record_empty_poll(),
    }

    Ok(Json(PendingTaskResponse { task }))
}

/// POST /api/get-pending-task
///
/// Returns:
/// - 200: `{ success, message }`
/// - 400: missing task id
/// - 404: task expired or never existed
/// - 500: store failure
pub async fn update_task(
    State(state): State<AppState>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<Json<UpdateTaskResponse>> {
    let request = json_body(payload)?;

    let task_id = request
        .task_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::invalid_request("Task ID is required"))?;

    let outcome = TaskOutcome {
        result: request.result,
        error: request.error,
    };

    let task = state
        .queue
        .report(&task_id, outcome)
        .await
        .map_err(|e| ApiError::from_queue("Failed to update task", e))?;

    match task.status {
        TaskStatus::Failed => metrics::record_task_failed(),
        _ => metrics::record_task_completed(),
    }

    Ok(Json(UpdateTaskResponse {
        success: true,
        message: "Task updated successfully".to_string(),
    }))
}

/// Any other method on either endpoint.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
