//! Process supervisor: binds listeners, waits for a shutdown signal and
//! drains the servers within the configured timeout.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::errors::{TimeMcpError, TimeMcpResult};
use crate::http::{HttpServer, HttpState, bind_listener, create_metrics_router, create_router};
use crate::metrics::Metrics;
use crate::server::TimeService;

pub struct App {
    config: Arc<Config>,
    metrics: Arc<Metrics>,
    shutdown: CancellationToken,
}

impl App {
    pub fn new(config: Config) -> Self {
        let metrics = Arc::new(Metrics::new(config.server.version.clone()));
        Self {
            config: Arc::new(config),
            metrics,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancelling this token stops the app as a signal would
    #[cfg(test)]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Bind every listener. Nothing is served until [`App::run`].
    pub async fn bind(&self) -> TimeMcpResult<Vec<HttpServer>> {
        let server_config = &self.config.server;
        let state = HttpState::new(self.config.clone(), self.metrics.clone());

        let listener = bind_listener(&server_config.bind_address())
            .await
            .inspect_err(|e| error!(error = %e, "Failed to bind MCP listener"))?;
        let addr = listener
            .local_addr()
            .map_err(|source| TimeMcpError::Server {
                listener: "mcp",
                source,
            })?;
        let service = TimeService::new(self.config.clone(), self.metrics.clone());
        let router = create_router(service, state.clone(), addr, self.shutdown.child_token());
        let mut servers = vec![HttpServer::new("mcp", listener, router)];

        if self.config.metrics.separate_listener(server_config.port) {
            let metrics_addr = format!("{}:{}", server_config.host, self.config.metrics.port);
            let listener = bind_listener(&metrics_addr)
                .await
                .inspect_err(|e| error!(error = %e, "Failed to bind metrics listener"))?;
            servers.push(HttpServer::new(
                "metrics",
                listener,
                create_metrics_router(state),
            ));
        }

        Ok(servers)
    }

    /// Serve until SIGINT/SIGTERM, a cancelled shutdown token, or an early
    /// listener failure, then wait for the listeners to drain.
    pub async fn run(self) -> TimeMcpResult<()> {
        let servers = self.bind().await?;
        self.serve(servers).await
    }

    async fn serve(self, servers: Vec<HttpServer>) -> TimeMcpResult<()> {
        let mut tasks = JoinSet::new();
        for server in servers {
            if let Ok(addr) = server.local_addr() {
                info!(listener = server.name(), %addr, "Listening");
            }
            tasks.spawn(server.serve(self.shutdown.clone()));
        }

        info!(
            name = %self.config.server.name,
            version = %self.config.server.version,
            "Time MCP server started"
        );

        let mut early_exit = None;
        tokio::select! {
            signal = wait_for_signal() => signal?,
            _ = self.shutdown.cancelled() => info!("Shutdown requested"),
            Some(joined) = tasks.join_next() => {
                warn!("A listener stopped before shutdown was requested");
                early_exit = Some(flatten(joined));
            }
        }

        self.shutdown.cancel();

        let timeout = self.config.server.graceful_shutdown_timeout();
        info!(?timeout, "Shutting down");
        let drained = tokio::time::timeout(timeout, async {
            let mut first_error = None;
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = flatten(joined) {
                    error!(error = %e, "Listener failed during shutdown");
                    first_error.get_or_insert(e);
                }
            }
            first_error
        })
        .await;

        match drained {
            Err(_) => {
                error!(?timeout, "Graceful shutdown timed out");
                Err(TimeMcpError::ShutdownTimeout { timeout })
            }
            Ok(drain_error) => {
                if let Some(Err(e)) = early_exit {
                    return Err(e);
                }
                if let Some(e) = drain_error {
                    return Err(e);
                }
                info!("Shutdown complete");
                Ok(())
            }
        }
    }
}

fn flatten(joined: Result<TimeMcpResult<()>, tokio::task::JoinError>) -> TimeMcpResult<()> {
    joined.map_err(|e| TimeMcpError::Server {
        listener: "task",
        source: std::io::Error::other(e),
    })?
}

/// Wait for SIGTERM or SIGINT (Ctrl+C elsewhere)
async fn wait_for_signal() -> TimeMcpResult<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate()).map_err(TimeMcpError::Signal)?;
        let mut sigint = signal(SignalKind::interrupt()).map_err(TimeMcpError::Signal)?;

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT (Ctrl+C)"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .map_err(TimeMcpError::Signal)?;
        info!("Received Ctrl+C");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{Router, routing::get};
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    use super::*;

    fn ephemeral_config() -> Config {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config.metrics.port = 0;
        config
    }

    #[tokio::test]
    async fn test_shared_port_binds_single_listener() {
        let app = App::new(ephemeral_config());
        let servers = app.bind().await.unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].name(), "mcp");
    }

    #[tokio::test]
    async fn test_separate_metrics_listener() {
        let mut config = ephemeral_config();
        // Reserve a free port, then release it for the metrics listener
        let reserved = bind_listener("127.0.0.1:0").await.unwrap();
        config.metrics.port = reserved.local_addr().unwrap().port();
        drop(reserved);

        let app = App::new(config);
        let servers = app.bind().await.unwrap();
        let names: Vec<_> = servers.iter().map(HttpServer::name).collect();
        assert_eq!(names, vec!["mcp", "metrics"]);
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = bind_listener("127.0.0.1:0").await.unwrap();
        let mut config = ephemeral_config();
        config.server.port = taken.local_addr().unwrap().port();

        let result = App::new(config).run().await;
        assert!(matches!(result, Err(TimeMcpError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_run_stops_when_token_cancelled() {
        let app = App::new(ephemeral_config());
        let shutdown = app.shutdown_token();
        let handle = tokio::spawn(app.run());

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();

        let result = tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("app stops")
            .expect("task completes");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_run_fails_when_drain_exceeds_timeout() {
        let mut config = ephemeral_config();
        config.server.graceful_shutdown_timeout_secs = 1;
        let app = App::new(config);
        let shutdown = app.shutdown_token();

        let router = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "done"
            }),
        );
        let listener = bind_listener("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(app.serve(vec![HttpServer::new("slow", listener, router)]));

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET /slow HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.cancel();

        let result = tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("app stops")
            .expect("task completes");
        assert!(matches!(
            result,
            Err(TimeMcpError::ShutdownTimeout { timeout }) if timeout == Duration::from_secs(1)
        ));
        drop(client);
    }
}
