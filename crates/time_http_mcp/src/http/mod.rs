//! HTTP surface of the time MCP server
//!
//! Both MCP transports share one listener with the health and, by default,
//! metrics endpoints.
//!
//! # Route Structure
//!
//! ```text
//! /sse         - GET, MCP SSE event stream
//! /message     - POST, MCP SSE client messages
//! /streamable  - MCP streamable HTTP (stateless)
//! /mcp         - alias of /streamable
//! /health      - GET, health check
//! /metrics     - GET, Prometheus metrics (path configurable; may live on its own port)
//! ```

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;

use std::sync::Arc;

use crate::config::Config;
use crate::metrics::Metrics;

pub use routes::{create_metrics_router, create_router};
pub use server::{HttpServer, bind_listener};

/// State shared by the plain HTTP handlers
#[derive(Debug, Clone)]
pub struct HttpState {
    pub config: Arc<Config>,
    pub metrics: Arc<Metrics>,
}

impl HttpState {
    pub fn new(config: Arc<Config>, metrics: Arc<Metrics>) -> Self {
        Self { config, metrics }
    }
}
