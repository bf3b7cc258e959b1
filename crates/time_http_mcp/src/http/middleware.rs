//! Transport request accounting

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::metrics::{Metrics, Outcome};

/// Label state for one MCP transport
#[derive(Debug, Clone)]
pub struct TransportState {
    pub metrics: Arc<Metrics>,
    pub transport: &'static str,
}

impl TransportState {
    pub fn new(metrics: Arc<Metrics>, transport: &'static str) -> Self {
        Self { metrics, transport }
    }
}

/// Log and count every request reaching an MCP transport.
///
/// Bare `OPTIONS` requests are answered here with 200; CORS preflights are
/// already handled by the outer CORS layer.
pub async fn transport_metrics(
    State(state): State<TransportState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    debug!(transport = state.transport, method = %method, path = %path, "MCP transport request");

    let response = if method == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    let status = response.status();
    let outcome = if status.is_client_error() || status.is_server_error() {
        Outcome::Error
    } else {
        Outcome::Success
    };
    state
        .metrics
        .record_transport_request(state.transport, method.as_str(), outcome);
    debug!(
        transport = state.transport,
        method = %method,
        path = %path,
        status = status.as_u16(),
        "MCP transport response"
    );

    response
}
