//! Shared task models for the Bilibili transcript queue.
//!
//! This crate provides:
//! - The task record and its status lifecycle
//! - Task id generation
//! - Bilibili video id extraction
//! - Encoding of tasks to and from store hash fields

pub mod error;
pub mod fields;
pub mod task;
pub mod video;

pub use error::{ModelError, ModelResult};
pub use task::{Task, TaskId, TaskOutcome, TaskStatus};
pub use video::extract_video_id;
