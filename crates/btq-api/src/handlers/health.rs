//! Health check handlers.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::error;

use crate::metrics;
use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_tasks: Option<u64>,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub store: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Readiness check endpoint (readiness).
/// Pings the store and reads the pending list length.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let backend = state.queue.backend().to_string();
    let start = Instant::now();

    let check = async {
        state.queue.ping().await?;
        state.queue.pending_len().await
    };

    match check.await {
        Ok(pending) => {
            metrics::set_pending_length(pending);
            Ok(Json(ReadinessResponse {
                status: "ready".to_string(),
                checks: ReadinessChecks {
                    store: CheckStatus {
                        status: "ok".to_string(),
                        backend,
                        error: None,
                        latency_ms: Some(start.elapsed().as_millis() as u64),
                    },
                },
                pending_tasks: Some(pending),
            }))
        }
        Err(e) => {
            error!(backend = %backend, error = %e, "Readiness check failed");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "degraded".to_string(),
                    checks: ReadinessChecks {
                        store: CheckStatus {
                            status: "error".to_string(),
                            backend,
                            error: Some("store unavailable".to_string()),
                            latency_ms: None,
                        },
                    },
                    pending_tasks: None,
                }),
            ))
        }
    }
}
