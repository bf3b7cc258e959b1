//! HTTP listener lifecycle

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::errors::{TimeMcpError, TimeMcpResult};

/// Bind a TCP listener, mapping failures to [`TimeMcpError::Bind`]
pub async fn bind_listener(addr: &str) -> TimeMcpResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| TimeMcpError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// A bound listener paired with the router it serves
pub struct HttpServer {
    name: &'static str,
    listener: TcpListener,
    router: Router,
}

impl HttpServer {
    pub fn new(name: &'static str, listener: TcpListener, router: Router) -> Self {
        Self {
            name,
            listener,
            router,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn local_addr(&self) -> TimeMcpResult<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|source| TimeMcpError::Server {
                listener: self.name,
                source,
            })
    }

    /// Serve until `shutdown` is cancelled, then drain in-flight requests
    pub async fn serve(self, shutdown: CancellationToken) -> TimeMcpResult<()> {
        let name = self.name;
        if let Ok(addr) = self.listener.local_addr() {
            info!(listener = name, %addr, "HTTP listener started");
        }

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                info!(listener = name, "HTTP listener received shutdown signal");
            })
            .await
            .map_err(|source| TimeMcpError::Server {
                listener: name,
                source,
            })?;

        info!(listener = name, "HTTP listener stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    #[tokio::test]
    async fn test_bind_failure_names_address() {
        let taken = bind_listener("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap().to_string();

        match bind_listener(&addr).await {
            Err(TimeMcpError::Bind { addr: reported, .. }) => assert_eq!(reported, addr),
            other => panic!("expected bind error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_serve_stops_on_cancel() {
        let listener = bind_listener("127.0.0.1:0").await.unwrap();
        let router = Router::new().route("/", get(|| async { "ok" }));
        let server = HttpServer::new("test", listener, router);
        assert!(server.local_addr().is_ok());

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(server.serve(shutdown.clone()));
        shutdown.cancel();

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("server stops")
            .expect("task completes");
        assert!(result.is_ok());
    }
}
