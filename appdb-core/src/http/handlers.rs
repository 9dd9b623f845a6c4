//! HTTP handlers for the worker endpoint

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use super::state::AppState;
use crate::dispatch::{DispatchResponse, InboundRequest, RequestEnvelope};

/// Header carrying the developer credential
pub const DEVELOPER_KEY_HEADER: &str = "Developer-Key";

#[derive(Debug, Default, Deserialize)]
pub struct WorkerQuery {
    pub key: Option<String>,
}

impl IntoResponse for DispatchResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body)).into_response()
    }
}

/// POST /worker-endpoint?key=<k>
pub async fn worker_endpoint(
    State(state): State<Arc<AppState>>,
    query: Result<Query<WorkerQuery>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => {
            return DispatchResponse::error(
                400,
                format!("Malformed query string: {}", rejection.body_text()),
            )
            .into_response()
        }
    };
    let envelope = match RequestEnvelope::from_body(&body) {
        Ok(envelope) => envelope,
        Err(err) => return DispatchResponse::from(err).into_response(),
    };

    let request = InboundRequest {
        envelope,
        query_key: query.key,
        developer_key: headers
            .get(DEVELOPER_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned),
    };

    let dispatcher = state.dispatcher.clone();
    match tokio::task::spawn_blocking(move || dispatcher.dispatch(&request)).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            error!("dispatch task failed: {}", e);
            DispatchResponse::error(500, "Internal error").into_response()
        }
    }
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let checker = state.health.clone();
    let backend = state.dispatcher.backend().clone();

    match tokio::task::spawn_blocking(move || checker.check(&backend)).await {
        Ok(report) => {
            let status = StatusCode::from_u16(report.status.to_http_status())
                .unwrap_or(StatusCode::SERVICE_UNAVAILABLE);
            (status, Json(report)).into_response()
        }
        Err(e) => {
            error!("health check task failed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}
