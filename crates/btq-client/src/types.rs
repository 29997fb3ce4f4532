//! Request/response bodies of the task API.

use btq_models::{Task, TaskId, TaskOutcome};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmitRequest<'a> {
    pub video_url: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub task_id: TaskId,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PendingTaskResponse {
    pub task: Option<Task>,
}

/// Body of `POST /get-pending-task`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest<'a> {
    pub task_id: &'a str,
    #[serde(flatten)]
    pub outcome: TaskOutcome,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_body_omits_absent_fields() {
        let body = ReportRequest {
            task_id: "task_1_abcdefghi",
            outcome: TaskOutcome::failure("boom"),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "taskId": "task_1_abcdefghi", "error": "boom" })
        );
    }
}
