//! Task queue over a hosted Redis-compatible store.
//!
//! This crate provides:
//! - A `TaskStore` abstraction with Redis, REST and in-memory backends
//! - Queue configuration from the environment
//! - The queue protocol: submit, claim and report

pub mod config;
pub mod error;
pub mod queue;
pub mod store;

pub use config::{QueueConfig, StoreBackend};
pub use error::{QueueError, QueueResult};
pub use queue::TaskQueue;
pub use store::{connect, MemoryStore, RedisStore, RestStore, TaskStore};
