//! Axum HTTP API.
//!
//! This crate provides:
//! - Task submission and the worker exchange endpoint
//! - CORS, request id and request logging middleware
//! - Health, readiness and Prometheus metrics endpoints

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
