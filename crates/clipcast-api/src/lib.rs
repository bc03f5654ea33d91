//! Axum HTTP/WS API server.
//!
//! This crate provides:
//! - Job creation, querying, caption editing and refresh over REST
//! - Progress streaming over WebSocket, with a polling fallback
//! - HS256 bearer and signed anonymous-session identity resolution
//! - Rate limiting, security headers, and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod orchestrator;
pub mod routes;
pub mod security;
pub mod services;
pub mod state;
pub mod ws;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use orchestrator::Orchestrator;
pub use routes::create_router;
pub use services::{PromotionService, StaleJobDetector};
pub use state::AppState;
