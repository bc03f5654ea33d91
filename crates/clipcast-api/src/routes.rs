//! API routes.

use axum::middleware;
use axum::routing::{get, patch, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::handlers::health::{health, ready};
use crate::handlers::jobs::{create_job, get_job_history, query_job, refresh_video, update_captions};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, rate_limit_middleware, request_id, request_logging, security_headers, RateLimiterCache};
use crate::state::AppState;
use crate::ws::ws_job_progress;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let job_routes = Router::new()
        .route("/jobs", post(create_job))
        .route("/jobs/:job_id", get(query_job))
        .route("/jobs/:job_id/history", get(get_job_history))
        .route("/jobs/:job_id/captions", patch(update_captions))
        .route("/jobs/:job_id/refresh", post(refresh_video));

    // Create rate limiter for API routes
    let rate_limiter = std::sync::Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new().merge(job_routes).layer(middleware::from_fn_with_state(
        rate_limiter.clone(),
        rate_limit_middleware,
    ));

    let ws_routes = Router::new().route("/ws/jobs/:job_id", get(ws_job_progress));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
