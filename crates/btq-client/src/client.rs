//! Task API HTTP client.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use btq_models::{Task, TaskId, TaskOutcome};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::types::{
    ErrorBody, HealthResponse, PendingTaskResponse, ReportRequest, SubmitRequest, SubmitResponse,
};

/// Configuration for the task client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the task API, including the `/api` prefix
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries of a report; submissions and claims are sent once
    pub max_retries: u32,
    /// Sent as `worker_id` when polling
    pub worker_id: Option<String>,
    /// Wait between polls of an empty queue
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 2,
            worker_id: None,
            poll_interval: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            base_url: lookup("BTQ_API_URL").unwrap_or(defaults.base_url),
            timeout: lookup("BTQ_CLIENT_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_retries: lookup("BTQ_CLIENT_RETRIES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            worker_id: lookup("BTQ_WORKER_ID").filter(|s| !s.is_empty()),
            poll_interval: lookup("BTQ_POLL_INTERVAL")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
        }
    }
}

/// Client for the task API.
pub struct TaskClient {
    http: Client,
    config: ClientConfig,
}

impl TaskClient {
    /// Create a new task client.
    pub fn new(mut config: ClientConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ClientError::Network)?;

        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Queue a video URL and return the new task's id.
    ///
    /// Sent once. A failed submission may still have queued the task, so a
    /// resend could queue it twice.
    pub async fn submit(&self, video_url: &str) -> ClientResult<TaskId> {
        let url = format!("{}/submit-task", self.config.base_url);
        let body = SubmitRequest { video_url };

        let response: SubmitResponse =
            decode(self.http.post(&url).json(&body).send().await?).await?;

        if !response.success {
            return Err(ClientError::InvalidResponse(format!(
                "submission not acknowledged: {}",
                response.message
            )));
        }

        info!(task_id = %response.task_id, "Submitted task");
        Ok(response.task_id)
    }

    /// Claim the oldest pending task, if any.
    ///
    /// Sent once: every attempt pops the queue, so a resend after a lost
    /// response would strand the first task in `processing`.
    pub async fn fetch_pending(&self) -> ClientResult<Option<Task>> {
        let url = format!("{}/get-pending-task", self.config.base_url);

        let mut request = self.http.get(&url);
        if let Some(worker_id) = &self.config.worker_id {
            request = request.query(&[("worker_id", worker_id)]);
        }
        let response: PendingTaskResponse = decode(request.send().await?).await?;

        match &response.task {
            Some(task) => debug!(task_id = %task.task_id, "Claimed task"),
            None => debug!("No pending task"),
        }
        Ok(response.task)
    }

    /// Report a successful result.
    pub async fn report_success(&self, task_id: &str, result: impl Into<Value>) -> ClientResult<()> {
        self.report(task_id, TaskOutcome::success(result)).await
    }

    /// Report a failure.
    pub async fn report_failure(&self, task_id: &str, error: impl Into<Value>) -> ClientResult<()> {
        self.report(task_id, TaskOutcome::failure(error)).await
    }

    /// Report an outcome. A 404 means the task expired before the report.
    ///
    /// Retried on transient errors; a repeated report rewrites the same
    /// fields.
    pub async fn report(&self, task_id: &str, outcome: TaskOutcome) -> ClientResult<()> {
        let url = format!("{}/get-pending-task", self.config.base_url);
        let body = ReportRequest { task_id, outcome };

        let _: Value = self
            .with_retry(|| async { decode(self.http.post(&url).json(&body).send().await?).await })
            .await?;

        info!(task_id, "Reported task outcome");
        Ok(())
    }

    /// Check if the API is healthy.
    pub async fn health_check(&self) -> ClientResult<bool> {
        let root = self
            .config
            .base_url
            .strip_suffix("/api")
            .unwrap_or(&self.config.base_url);
        let url = format!("{}/health", root);

        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let health: HealthResponse = response.json().await?;
                Ok(health.status == "healthy" || health.status == "ok")
            }
            Ok(response) => {
                warn!("Task API health check failed: {}", response.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Task API health check error: {}", e);
                Ok(false)
            }
        }
    }

    /// Poll for tasks until `shutdown` resolves, running `handler` on each
    /// claimed task and reporting what it returns.
    ///
    /// An `Err` from the handler is reported as the task's error. The loop
    /// sleeps `poll_interval` after an empty or failed poll and polls again
    /// right away after handling a task. Shutdown is observed between polls,
    /// never while a claim or a handler is running. Returns the number of
    /// tasks handled.
    pub async fn poll_loop<H, Fut, E, S>(&self, handler: H, shutdown: S) -> u64
    where
        H: Fn(Task) -> Fut,
        Fut: Future<Output = Result<Value, E>>,
        E: Display,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut handled: u64 = 0;

        info!(
            base_url = %self.config.base_url,
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "Starting poll loop"
        );

        loop {
            let wait = match self.fetch_pending().await {
                Ok(Some(task)) => {
                    let task_id = task.task_id.clone();
                    info!(task_id = %task_id, video_id = %task.video_id, "Processing task");

                    let outcome = match handler(task).await {
                        Ok(result) => TaskOutcome::success(result),
                        Err(e) => {
                            warn!(task_id = %task_id, error = %e, "Task handler failed");
                            TaskOutcome::failure(e.to_string())
                        }
                    };

                    if let Err(e) = self.report(task_id.as_str(), outcome).await {
                        warn!(task_id = %task_id, error = %e, "Failed to report task outcome");
                    }
                    handled += 1;
                    Duration::ZERO
                }
                Ok(None) => {
                    debug!("Queue empty, waiting");
                    self.config.poll_interval
                }
                Err(e) => {
                    warn!(error = %e, "Failed to fetch pending task");
                    self.config.poll_interval
                }
            };

            // A claim in flight is never cancelled; shutdown is checked here only.
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        info!(handled, "Poll loop stopped");
        handled
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> ClientResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = ClientResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        "Task API request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Turn a response into its JSON body, or an [`ClientError::Api`] carrying
/// the `error` message for non-2xx statuses.
async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);
        return Err(ClientError::Api { status, message });
    }

    Ok(serde_json::from_str(&body)?)
}
