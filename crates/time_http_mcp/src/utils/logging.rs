use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::{LogConfig, LogFormat};
use crate::errors::{TimeMcpError, TimeMcpResult};

/// Initialize the global tracing subscriber
///
/// `RUST_LOG`, when set, takes precedence over the configured level.
/// Output goes to stderr, as JSON lines or plain text.
///
/// # Returns
/// - `Ok(())` if logging is successfully initialized
/// - `Err(TimeMcpError::LoggingInitialization)` if a subscriber is already set
///   or the filter is malformed
pub fn init_logging(config: &LogConfig) -> TimeMcpResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.to_ascii_lowercase()))
        .map_err(|e| TimeMcpError::LoggingInitialization(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    result.map_err(|e| TimeMcpError::LoggingInitialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        let config = LogConfig::default();
        let _ = init_logging(&config);

        let result = init_logging(&config);
        assert!(matches!(
            result,
            Err(TimeMcpError::LoggingInitialization(_))
        ));
    }
}
