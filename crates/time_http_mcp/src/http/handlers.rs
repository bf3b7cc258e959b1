//! Health and monitoring handlers

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::HttpState;
use crate::metrics::CONTENT_TYPE;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    /// RFC3339, UTC
    pub timestamp: String,
}

/// Liveness probe. Answers as long as the process serves requests.
pub async fn health_check(State(state): State<HttpState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.server.name.clone(),
        version: state.config.server.version.clone(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}

/// Prometheus metrics endpoint
pub async fn prometheus_metrics(
    State(state): State<HttpState>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, CONTENT_TYPE)],
        state.metrics.render(),
    )
}
