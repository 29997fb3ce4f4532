//! Backing store abstraction.
//!
//! The queue only needs a handful of list and hash commands. Each backend
//! maps them onto its own transport; `rpop` must be atomic per element.

mod memory;
mod redis_store;
mod rest;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::config::{QueueConfig, StoreBackend};
use crate::error::QueueResult;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use rest::RestStore;

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Pop one element from the right end of a list.
    async fn rpop(&self, list: &str) -> QueueResult<Option<String>>;

    /// Push one element onto the left end of a list.
    async fn lpush(&self, list: &str, value: &str) -> QueueResult<()>;

    /// Length of a list (0 when missing).
    async fn llen(&self, list: &str) -> QueueResult<u64>;

    /// All fields of a hash (empty when missing or expired).
    async fn hgetall(&self, key: &str) -> QueueResult<HashMap<String, String>>;

    /// Set hash fields, leaving unlisted fields and the key's expiry intact.
    async fn hset(&self, key: &str, fields: &[(String, String)]) -> QueueResult<()>;

    /// Set a time-to-live on a key.
    async fn expire(&self, key: &str, ttl: Duration) -> QueueResult<()>;

    /// Round-trip to the store.
    async fn ping(&self) -> QueueResult<()>;

    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;
}

/// Build the store selected by the config.
pub fn connect(config: &QueueConfig) -> QueueResult<Arc<dyn TaskStore>> {
    let store: Arc<dyn TaskStore> = match config.backend()? {
        StoreBackend::Rest { url, token } => {
            Arc::new(RestStore::new(url, token, config.store_timeout)?)
        }
        StoreBackend::Redis { url } => Arc::new(RedisStore::new(&url)?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    info!("Using {} task store", store.backend());
    Ok(store)
}
