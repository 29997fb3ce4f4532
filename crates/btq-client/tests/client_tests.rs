//! Client tests against a mocked task API.

use std::time::Duration;

use btq_client::{ClientConfig, ClientError, TaskClient};
use btq_models::{Task, TaskStatus};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, max_retries: u32) -> TaskClient {
    TaskClient::new(ClientConfig {
        base_url: format!("{}/api", server.uri()),
        timeout: Duration::from_secs(5),
        max_retries,
        worker_id: Some("mac-mini".to_string()),
        poll_interval: Duration::from_millis(20),
    })
    .unwrap()
}

fn claimed_task() -> serde_json::Value {
    json!({
        "taskId": "task_1714552200123_k3j9x0q2m",
        "videoUrl": "https://www.bilibili.com/video/BV1xyz",
        "videoId": "BV1xyz",
        "status": "processing",
        "createdAt": "2024-05-01T08:30:00.123Z",
        "processingStartedAt": "2024-05-01T08:31:00.456Z",
        "result": null,
        "error": null
    })
}

#[tokio::test]
async fn test_submit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit-task"))
        .and(body_json(json!({ "videoUrl": "BV1xyz" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "taskId": "task_1714552200123_k3j9x0q2m",
            "message": "Task submitted successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let task_id = client(&server, 0).submit("BV1xyz").await.unwrap();
    assert_eq!(task_id.as_str(), "task_1714552200123_k3j9x0q2m");
}

#[tokio::test]
async fn test_submit_rejected_url_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit-task"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "Invalid Bilibili video URL" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 2).submit("https://example.com").await.unwrap_err();
    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status.as_u16(), 400);
            assert_eq!(message, "Invalid Bilibili video URL");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_pending_sends_worker_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get-pending-task"))
        .and(query_param("worker_id", "mac-mini"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "task": claimed_task() })))
        .expect(1)
        .mount(&server)
        .await;

    let task = client(&server, 0).fetch_pending().await.unwrap().unwrap();
    assert_eq!(task.task_id.as_str(), "task_1714552200123_k3j9x0q2m");
    assert_eq!(task.status, TaskStatus::Processing);
    assert_eq!(task.video_id, "BV1xyz");
    assert!(task.processing_started_at.is_some());
}

#[tokio::test]
async fn test_fetch_pending_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get-pending-task"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "task": null })))
        .mount(&server)
        .await;

    assert!(client(&server, 0).fetch_pending().await.unwrap().is_none());
}

#[tokio::test]
async fn test_fetch_pending_is_sent_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get-pending-task"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "Failed to get pending task" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 2).fetch_pending().await.unwrap_err();
    assert!(err.is_retryable());
    match err {
        ClientError::Api { message, .. } => assert_eq!(message, "Failed to get pending task"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_submit_is_sent_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit-task"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "Failed to submit task" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 2).submit("BV1abc").await.unwrap_err();
    assert!(matches!(err, ClientError::Api { .. }));
}

#[tokio::test]
async fn test_report_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/get-pending-task"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "Failed to update task" })),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/get-pending-task"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Task updated successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server, 1)
        .report_success("task_1_abcdefghi", "ok")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_report_retries_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/get-pending-task"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .expect(2)
        .mount(&server)
        .await;

    let err = client(&server, 1)
        .report_success("task_1_abcdefghi", "ok")
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    match err {
        ClientError::Api { message, .. } => assert_eq!(message, "upstream unavailable"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_report_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/get-pending-task"))
        .and(body_json(json!({
            "taskId": "task_1_abcdefghi",
            "result": { "title": "x" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Task updated successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server, 0)
        .report_success("task_1_abcdefghi", json!({ "title": "x" }))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_report_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/get-pending-task"))
        .and(body_json(json!({ "taskId": "task_1_abcdefghi", "error": "boom" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Task updated successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server, 0)
        .report_failure("task_1_abcdefghi", "boom")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_report_expired_task() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/get-pending-task"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "Task not found" })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 2)
        .report_success("task_1_abcdefghi", "ok")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "version": "0.1.0",
            "timestamp": "2024-05-01T08:30:00Z"
        })))
        .mount(&server)
        .await;

    assert!(client(&server, 0).health_check().await.unwrap());
}

#[tokio::test]
async fn test_health_check_down() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    assert!(!client(&server, 0).health_check().await.unwrap());
}

// ============================================================================
// Poll loop
// ============================================================================

async fn mount_single_task(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/get-pending-task"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "task": claimed_task() })))
        .up_to_n_times(1)
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/get-pending-task"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "task": null })))
        .expect(1..)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_poll_loop_reports_result() {
    let server = MockServer::start().await;
    mount_single_task(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/get-pending-task"))
        .and(body_json(json!({
            "taskId": "task_1714552200123_k3j9x0q2m",
            "result": "transcript"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Task updated successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let handled = client(&server, 0)
        .poll_loop(
            |task: Task| async move {
                assert_eq!(task.video_id, "BV1xyz");
                Ok::<_, String>(json!("transcript"))
            },
            tokio::time::sleep(Duration::from_millis(300)),
        )
        .await;
    assert_eq!(handled, 1);
}

#[tokio::test]
async fn test_poll_loop_reports_handler_error() {
    let server = MockServer::start().await;
    mount_single_task(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/get-pending-task"))
        .and(body_json(json!({
            "taskId": "task_1714552200123_k3j9x0q2m",
            "error": "download failed"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Task updated successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let handled = client(&server, 0)
        .poll_loop(
            |_task: Task| async move { Err::<serde_json::Value, _>("download failed".to_string()) },
            tokio::time::sleep(Duration::from_millis(300)),
        )
        .await;
    assert_eq!(handled, 1);
}

#[tokio::test]
async fn test_poll_loop_survives_fetch_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get-pending-task"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "Failed to get pending task" })),
        )
        .expect(2..)
        .mount(&server)
        .await;

    let handled = client(&server, 0)
        .poll_loop(
            |_task: Task| async move { Ok::<_, String>(json!(null)) },
            tokio::time::sleep(Duration::from_millis(200)),
        )
        .await;
    assert_eq!(handled, 0);
}
