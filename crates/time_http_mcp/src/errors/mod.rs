use std::time::Duration;

/// Result type for process-level operations
pub type TimeMcpResult<T> = Result<T, TimeMcpError>;

/// Startup, transport and shutdown errors. All of them end the process.
#[derive(thiserror::Error, Debug)]
pub enum TimeMcpError {
    #[error("Configuration error: {message}")]
    Config { message: String },
    /// Logging initialization failed
    #[error("Logging initialization failed: {0}")]
    LoggingInitialization(String),
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{listener} server failed: {source}")]
    Server {
        listener: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),
    #[error("Graceful shutdown did not complete within {timeout:?}")]
    ShutdownTimeout { timeout: Duration },
}
