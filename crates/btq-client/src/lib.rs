//! Client for the task queue HTTP API.
//!
//! Submitters use [`TaskClient::submit`]. Workers poll with
//! [`TaskClient::fetch_pending`] and hand back what they produced with
//! [`TaskClient::report_success`] or [`TaskClient::report_failure`].

pub mod client;
pub mod error;
pub mod types;

pub use client::{ClientConfig, TaskClient};
pub use error::{ClientError, ClientResult};
pub use types::{HealthResponse, PendingTaskResponse, ReportRequest, SubmitResponse};
