//! Axum HTTP API server.
//!
//! This crate provides:
//! - The `POST /api/extract` endpoint over the extraction pipeline
//! - Per-IP rate limiting, CORS and security headers
//! - Prometheus metrics and health probes

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
