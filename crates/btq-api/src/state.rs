//! Application state.

use std::sync::Arc;

use btq_queue::{QueueResult, TaskQueue};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub queue: Arc<TaskQueue>,
}

impl AppState {
    pub fn new(config: ApiConfig, queue: TaskQueue) -> Self {
        Self {
            config,
            queue: Arc::new(queue),
        }
    }

    /// Build state with the store configured in the environment.
    pub fn from_env(config: ApiConfig) -> QueueResult<Self> {
        let queue = TaskQueue::from_env()?;
        Ok(Self::new(config, queue))
    }
}
