//! Route table

use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub const WORKER_PATH: &str = "/worker-endpoint";

/// Build the router with all endpoints
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(WORKER_PATH, post(handlers::worker_endpoint))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
}
