//! Task queue protocol.
//!
//! Submission writes the task hash, pushes its id on the left of the pending
//! list and sets the hash expiry. Claiming pops from the right, so the list
//! behaves as a FIFO. None of the multi-command sequences are transactional:
//! a failure halfway leaves whatever was already written, and the hash
//! expiry is the only cleanup.

use std::collections::HashMap;
use std::sync::Arc;

use btq_models::{Task, TaskId, TaskOutcome};
use tracing::{debug, info, warn};

use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};
use crate::store::{self, TaskStore};

/// Task queue client.
#[derive(Clone)]
pub struct TaskQueue {
    store: Arc<dyn TaskStore>,
    config: QueueConfig,
}

impl TaskQueue {
    /// Create a queue over an existing store.
    pub fn new(store: Arc<dyn TaskStore>, config: QueueConfig) -> Self {
        Self { store, config }
    }

    /// Create a queue, building the store the config points at.
    pub fn connect(config: QueueConfig) -> QueueResult<Self> {
        let store = store::connect(&config)?;
        Ok(Self::new(store, config))
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::connect(QueueConfig::from_env()?)
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Create a pending task for a video URL and queue it.
    pub async fn submit(&self, video_url: &str) -> QueueResult<Task> {
        let task = Task::new(video_url)
            .map_err(|_| QueueError::InvalidVideoUrl(video_url.to_string()))?;
        let key = task.task_id.as_str();

        self.store.hset(key, &task.to_fields()).await?;
        self.store.lpush(&self.config.pending_key, key).await?;
        self.store.expire(key, self.config.task_ttl).await?;

        info!(
            task_id = %task.task_id,
            video_id = %task.video_id,
            "Submitted task"
        );
        Ok(task)
    }

    /// Claim the oldest pending task.
    ///
    /// Returns `None` when the list is empty, and also when the popped id no
    /// longer has a hash behind it (it expired while queued). The pop is the
    /// only exclusion: the status rewrite that follows is a plain
    /// read-then-write.
    pub async fn claim(&self) -> QueueResult<Option<Task>> {
        let Some(raw_id) = self.store.rpop(&self.config.pending_key).await? else {
            debug!("No pending tasks");
            return Ok(None);
        };
        let task_id = TaskId::from(raw_id);

        let Some(mut task) = self.load(&task_id).await? else {
            warn!(task_id = %task_id, "Popped task has no record, skipping");
            return Ok(None);
        };

        task.start_processing();
        self.store.hset(task_id.as_str(), &task.to_fields()).await?;

        info!(task_id = %task_id, video_id = %task.video_id, "Claimed task");
        Ok(Some(task))
    }

    /// Record a worker's result or error for a task.
    ///
    /// Any current status is accepted, including `pending`.
    pub async fn report(&self, task_id: &str, outcome: TaskOutcome) -> QueueResult<Task> {
        let task_id = TaskId::from(task_id);

        let mut task = self
            .load(&task_id)
            .await?
            .ok_or_else(|| QueueError::TaskNotFound(task_id.to_string()))?;

        let previous = task.status;
        task.finish(outcome);
        self.store.hset(task_id.as_str(), &task.to_fields()).await?;

        info!(
            task_id = %task_id,
            from = %previous,
            to = %task.status,
            "Recorded task outcome"
        );
        Ok(task)
    }

    /// Read a task without changing it.
    pub async fn get(&self, task_id: &str) -> QueueResult<Option<Task>> {
        self.load(&TaskId::from(task_id)).await
    }

    /// Number of tasks waiting to be claimed.
    pub async fn pending_len(&self) -> QueueResult<u64> {
        self.store.llen(&self.config.pending_key).await
    }

    /// Check that the store answers.
    pub async fn ping(&self) -> QueueResult<()> {
        self.store.ping().await
    }

    async fn load(&self, task_id: &TaskId) -> QueueResult<Option<Task>> {
        let fields: HashMap<String, String> = self.store.hgetall(task_id.as_str()).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Task::from_fields(task_id.clone(), fields)
            .map(Some)
            .map_err(|source| QueueError::CorruptTask {
                task_id: task_id.to_string(),
                source,
            })
    }
}
