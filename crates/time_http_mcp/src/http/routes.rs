//! Router construction

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    middleware,
    routing::get,
};
use rmcp::transport::{
    sse_server::{SseServer, SseServerConfig},
    streamable_http_server::{
        StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
    },
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use super::handlers::{health_check, prometheus_metrics};
use super::middleware::{TransportState, transport_metrics};
use super::HttpState;
use crate::server::TimeService;

pub const SSE_PATH: &str = "/sse";
pub const MESSAGE_PATH: &str = "/message";
pub const STREAMABLE_PATH: &str = "/streamable";
pub const MCP_ALIAS_PATH: &str = "/mcp";
pub const HEALTH_PATH: &str = "/health";

/// Paths owned by the main router. A shared-port metrics route may not
/// reuse them, nor live under the nested streamable services.
pub const RESERVED_PATHS: &[&str] = &[
    SSE_PATH,
    MESSAGE_PATH,
    STREAMABLE_PATH,
    MCP_ALIAS_PATH,
    HEALTH_PATH,
];
pub const NESTED_PATHS: &[&str] = &[STREAMABLE_PATH, MCP_ALIAS_PATH];

const SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Build the main router: both MCP transports, health, and the metrics
/// route when metrics share the main port.
///
/// `bind` is the address the SSE transport advertises; `shutdown` closes
/// open SSE streams.
pub fn create_router(
    service: TimeService,
    state: HttpState,
    bind: SocketAddr,
    shutdown: CancellationToken,
) -> Router {
    let metrics = state.metrics.clone();

    let (sse_server, sse_router) = SseServer::new(SseServerConfig {
        bind,
        sse_path: SSE_PATH.to_string(),
        post_path: MESSAGE_PATH.to_string(),
        ct: shutdown,
        sse_keep_alive: Some(SSE_KEEP_ALIVE),
    });
    let sse_service = service.clone();
    sse_server.with_service(move || sse_service.clone());
    let sse_router = sse_router.layer(middleware::from_fn_with_state(
        TransportState::new(metrics.clone(), "sse"),
        transport_metrics,
    ));

    let streamable = StreamableHttpService::new(
        move || Ok(service.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig {
            stateful_mode: false,
            ..Default::default()
        },
    );
    let streamable_router = Router::new()
        .nest_service(STREAMABLE_PATH, streamable.clone())
        .nest_service(MCP_ALIAS_PATH, streamable)
        .layer(middleware::from_fn_with_state(
            TransportState::new(metrics, "streamable"),
            transport_metrics,
        ));

    let mut routes = Router::new().route(HEALTH_PATH, get(health_check));
    if state.config.metrics.enabled
        && !state
            .config
            .metrics
            .separate_listener(state.config.server.port)
    {
        routes = routes.route(&state.config.metrics.path, get(prometheus_metrics));
    }

    info!(
        sse = SSE_PATH,
        message = MESSAGE_PATH,
        streamable = STREAMABLE_PATH,
        "MCP transports mounted"
    );

    routes
        .with_state(state)
        .merge(sse_router)
        .merge(streamable_router)
        .layer(build_cors_layer())
}

/// Router for the dedicated metrics listener
pub fn create_metrics_router(state: HttpState) -> Router {
    let path = state.config.metrics.path.clone();
    Router::new()
        .route(&path, get(prometheus_metrics))
        .with_state(state)
}

fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::http::handlers::HealthResponse;
    use crate::metrics::Metrics;

    fn test_router(config: Config) -> Router {
        let config = Arc::new(config);
        let metrics = Arc::new(Metrics::new(config.server.version.clone()));
        let service = TimeService::new(config.clone(), metrics.clone());
        create_router(
            service,
            HttpState::new(config, metrics),
            "127.0.0.1:0".parse().unwrap(),
            CancellationToken::new(),
        )
    }

    fn shared_port_config() -> Config {
        let mut config = Config::default();
        config.metrics.port = config.server.port;
        config
    }

    #[tokio::test]
    async fn test_health() {
        let router = test_router(Config::default());

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.service, "mcp-server-time");
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
        assert!(health.timestamp.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_metrics_on_shared_port() {
        let router = test_router(shared_port_config());

        let response = router
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            crate::metrics::CONTENT_TYPE
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("mcp_time_info"));
    }

    #[tokio::test]
    async fn test_metrics_absent_from_main_router_with_separate_port() {
        let router = test_router(Config::default());

        let response = router
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_metrics_disabled() {
        let mut config = shared_port_config();
        config.metrics.enabled = false;
        let router = test_router(config);

        let response = router
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_custom_metrics_path_on_shared_port() {
        let mut config = shared_port_config();
        config.metrics.path = "/internal/metrics".to_string();
        assert!(config.validate().is_ok());
        let router = test_router(config);

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/internal/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_dedicated_metrics_router() {
        let mut config = Config::default();
        config.metrics.path = "/internal/metrics".to_string();
        let config = Arc::new(config);
        let router = create_metrics_router(HttpState::new(config, Arc::new(Metrics::new("1"))));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/internal/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let router = test_router(Config::default());

        let response = router
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri(STREAMABLE_PATH)
                    .header(header::ORIGIN, "http://localhost:3000")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
        let methods = response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(methods.contains("POST"));
    }
}
