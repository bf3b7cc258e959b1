//! Server configuration
//!
//! Layers, lowest to highest precedence:
//! 1. built-in defaults
//! 2. TOML file (`--config`, `MCP_TIME_CONFIG`, or `./config.toml` when present)
//! 3. `MCP_TIME_<SECTION>_<KEY>` environment variables
//! 4. CLI flags

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::format::TimeFormat;
use crate::core::provider::LOCAL_TIMEZONE_ALIAS;
use crate::errors::{TimeMcpError, TimeMcpResult};
use crate::http::routes::{NESTED_PATHS, RESERVED_PATHS};

/// Prefix of every configuration environment variable
pub const ENV_PREFIX: &str = "MCP_TIME";
/// Environment variable naming the configuration file
pub const ENV_CONFIG_PATH: &str = "MCP_TIME_CONFIG";
/// File picked up from the working directory when nothing else is given
pub const DEFAULT_CONFIG_FILENAME: &str = "config.toml";

pub const DEFAULT_SERVER_NAME: &str = "mcp-server-time";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_METRICS_PORT: u16 = 9090;
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub time: TimeConfig,
    pub logging: LogConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
    pub host: String,
    pub port: u16,
    /// Upper bound for draining in-flight requests on shutdown
    pub graceful_shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            graceful_shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

impl ServerConfig {
    pub fn graceful_shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.graceful_shutdown_timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// IANA name, or `Local` for the host's zone
    pub default_timezone: String,
    pub default_format: TimeFormat,
    pub supported_formats: Vec<TimeFormat>,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            default_timezone: DEFAULT_TIMEZONE.to_string(),
            default_format: TimeFormat::Rfc3339,
            supported_formats: TimeFormat::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    #[serde(alias = "console")]
    Text,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" | "console" => Ok(LogFormat::Text),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: DEFAULT_METRICS_PORT,
            path: DEFAULT_METRICS_PATH.to_string(),
        }
    }
}

impl MetricsConfig {
    /// Whether metrics get their own listener instead of a route on the main one
    pub fn separate_listener(&self, server_port: u16) -> bool {
        self.enabled && self.port != server_port
    }
}

/// CLI-level overrides applied last
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Config {
    /// Load defaults, file, environment and CLI overrides, then validate.
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> TimeMcpResult<Self> {
        let mut config = match resolve_config_path(path)? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> TimeMcpResult<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = std::fs::read_to_string(path).map_err(|e| TimeMcpError::Config {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> TimeMcpResult<Self> {
        toml::from_str(content).map_err(|e| TimeMcpError::Config {
            message: format!("failed to parse config: {}", e),
        })
    }

    /// Apply `MCP_TIME_<SECTION>_<KEY>` variables looked up through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> TimeMcpResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |section: &str, key: &str| {
            let name = format!("{}_{}_{}", ENV_PREFIX, section, key);
            lookup(&name).map(|value| (name, value))
        };

        if let Some((_, v)) = var("SERVER", "NAME") {
            self.server.name = v;
        }
        if let Some((_, v)) = var("SERVER", "VERSION") {
            self.server.version = v;
        }
        if let Some((_, v)) = var("SERVER", "HOST") {
            self.server.host = v;
        }
        if let Some((name, v)) = var("SERVER", "PORT") {
            self.server.port = parse_env(&name, &v)?;
        }
        if let Some((name, v)) = var("SERVER", "GRACEFUL_SHUTDOWN_TIMEOUT_SECS") {
            self.server.graceful_shutdown_timeout_secs = parse_env(&name, &v)?;
        }
        if let Some((_, v)) = var("TIME", "DEFAULT_TIMEZONE") {
            self.time.default_timezone = v;
        }
        if let Some((name, v)) = var("TIME", "DEFAULT_FORMAT") {
            self.time.default_format = parse_env(&name, &v)?;
        }
        if let Some((name, v)) = var("TIME", "SUPPORTED_FORMATS") {
            self.time.supported_formats = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| parse_env(&name, s))
                .collect::<TimeMcpResult<_>>()?;
        }
        if let Some((_, v)) = var("LOGGING", "LEVEL") {
            self.logging.level = v;
        }
        if let Some((name, v)) = var("LOGGING", "FORMAT") {
            self.logging.format = parse_env(&name, &v)?;
        }
        if let Some((name, v)) = var("METRICS", "ENABLED") {
            self.metrics.enabled = parse_env(&name, &v)?;
        }
        if let Some((name, v)) = var("METRICS", "PORT") {
            self.metrics.port = parse_env(&name, &v)?;
        }
        if let Some((_, v)) = var("METRICS", "PATH") {
            self.metrics.path = v;
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(host) = &overrides.host {
            self.server.host = host.clone();
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
    }

    /// Collect every problem instead of stopping at the first one
    pub fn validate(&self) -> TimeMcpResult<()> {
        let mut errors = Vec::new();

        if self.server.name.trim().is_empty() {
            errors.push("server.name must not be empty".to_string());
        }
        if self.server.port == 0 {
            errors.push("server.port must be greater than 0".to_string());
        }
        if self.server.graceful_shutdown_timeout_secs == 0 {
            errors.push("server.graceful_shutdown_timeout_secs must be greater than 0".to_string());
        }

        let timezone = &self.time.default_timezone;
        if !timezone.eq_ignore_ascii_case(LOCAL_TIMEZONE_ALIAS)
            && timezone.parse::<chrono_tz::Tz>().is_err()
        {
            errors.push(format!("time.default_timezone '{}' is not a valid IANA timezone", timezone));
        }
        if self.time.supported_formats.is_empty() {
            errors.push("time.supported_formats must not be empty".to_string());
        } else if !self.time.supported_formats.contains(&self.time.default_format) {
            errors.push(format!(
                "time.default_format '{}' is not listed in time.supported_formats",
                self.time.default_format
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            errors.push(format!(
                "logging.level '{}' must be one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }

        if self.metrics.enabled {
            if self.metrics.port == 0 {
                errors.push("metrics.port must be greater than 0".to_string());
            }
            errors.extend(metrics_path_errors(&self.metrics, self.server.port));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TimeMcpError::Config {
                message: errors.join("; "),
            })
        }
    }
}

/// Problems with `metrics.path` that would otherwise surface as a router panic
fn metrics_path_errors(metrics: &MetricsConfig, server_port: u16) -> Vec<String> {
    let path = metrics.path.as_str();
    let mut errors = Vec::new();

    if !path.starts_with('/') {
        errors.push(format!("metrics.path '{}' must start with '/'", path));
    }
    if path.contains(['{', '}', '*']) || path.split('/').any(|segment| segment.starts_with(':')) {
        errors.push(format!(
            "metrics.path '{}' must be a literal path without '{{', '}}', '*' or ':' segments",
            path
        ));
    }
    if !metrics.separate_listener(server_port) {
        let collides = RESERVED_PATHS.contains(&path)
            || NESTED_PATHS
                .iter()
                .any(|nested| path.strip_prefix(*nested).is_some_and(|rest| rest.starts_with('/')));
        if collides {
            errors.push(format!(
                "metrics.path '{}' collides with an MCP or health route on server.port",
                path
            ));
        }
    }

    errors
}

/// Explicit path must exist; otherwise fall back to the env var, then the
/// working-directory default if present.
fn resolve_config_path(path: Option<&Path>) -> TimeMcpResult<Option<PathBuf>> {
    let explicit = path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(ENV_CONFIG_PATH).map(PathBuf::from));

    match explicit {
        Some(path) if path.exists() => Ok(Some(path)),
        Some(path) => Err(TimeMcpError::Config {
            message: format!("config file not found: {}", path.display()),
        }),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILENAME);
            Ok(default.exists().then_some(default))
        }
    }
}

fn parse_env<T>(name: &str, value: &str) -> TimeMcpResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| TimeMcpError::Config {
        message: format!("invalid value '{}' for {}: {}", value, name, e),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::TempDir;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.time.default_format, TimeFormat::Rfc3339);
        assert_eq!(config.time.supported_formats.len(), 7);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.metrics.separate_listener(config.server.port));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
[server]
port = 9999

[time]
default_timezone = "Europe/London"
supported_formats = ["RFC3339", "unix"]

[logging]
format = "text"
"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9999);
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.time.default_timezone, "Europe/London");
        assert_eq!(
            config.time.supported_formats,
            vec![TimeFormat::Rfc3339, TimeFormat::Unix]
        );
        assert_eq!(config.logging.format, LogFormat::Text);
        assert_eq!(config.metrics.path, DEFAULT_METRICS_PATH);
    }

    #[test]
    fn test_console_log_format_alias() {
        let config = Config::from_toml("[logging]\nformat = \"console\"\n").unwrap();
        assert_eq!(config.logging.format, LogFormat::Text);

        let mut config = Config::default();
        config
            .apply_env(env(&[("MCP_TIME_LOGGING_FORMAT", "console")]))
            .unwrap();
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_unknown_format_in_file_is_rejected() {
        let result = Config::from_toml("[time]\ndefault_format = \"Kitchen\"\n");
        assert!(matches!(result, Err(TimeMcpError::Config { .. })));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::from_toml("[server]\nport = 9999\n").unwrap();
        config
            .apply_env(env(&[
                ("MCP_TIME_SERVER_PORT", "7000"),
                ("MCP_TIME_TIME_SUPPORTED_FORMATS", "RFC3339, UnixMilli"),
                ("MCP_TIME_METRICS_ENABLED", "false"),
                ("MCP_TIME_LOGGING_FORMAT", "text"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 7000);
        assert_eq!(
            config.time.supported_formats,
            vec![TimeFormat::Rfc3339, TimeFormat::UnixMilli]
        );
        assert!(!config.metrics.enabled);
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("MCP_TIME_SERVER_PORT", "eighty")]))
            .unwrap_err();
        assert!(err.to_string().contains("MCP_TIME_SERVER_PORT"));
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = Config::default();
        config
            .apply_env(env(&[("MCP_TIME_SERVER_PORT", "7000")]))
            .unwrap();
        config.apply_overrides(&Overrides {
            host: Some("127.0.0.1".to_string()),
            port: Some(6000),
        });

        assert_eq!(config.server.bind_address(), "127.0.0.1:6000");
    }

    #[test]
    fn test_validation_collects_errors() {
        let mut config = Config::default();
        config.server.port = 0;
        config.time.default_timezone = "Nowhere/Place".to_string();
        config.time.supported_formats = vec![TimeFormat::Unix];
        config.logging.level = "loud".to_string();
        config.metrics.path = "metrics".to_string();

        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("server.port"));
        assert!(message.contains("Nowhere/Place"));
        assert!(message.contains("time.default_format"));
        assert!(message.contains("logging.level"));
        assert!(message.contains("metrics.path"));
    }

    #[test]
    fn test_metrics_path_colliding_with_shared_routes() {
        for path in ["/health", "/sse", "/message", "/streamable", "/mcp", "/mcp/metrics"] {
            let mut config = Config::default();
            config.metrics.port = config.server.port;
            config.metrics.path = path.to_string();

            let message = config.validate().unwrap_err().to_string();
            assert!(message.contains("collides"), "{}: {}", path, message);
        }
    }

    #[test]
    fn test_reserved_metrics_path_allowed_on_own_port() {
        let mut config = Config::default();
        config.metrics.path = "/health".to_string();
        assert!(config.metrics.separate_listener(config.server.port));
        assert!(config.validate().is_ok());

        config.metrics.enabled = false;
        config.metrics.port = config.server.port;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_metrics_path_with_route_syntax() {
        for path in ["/{name}", "/metrics/*rest", "/:metrics", "/metrics}"] {
            let mut config = Config::default();
            config.metrics.path = path.to_string();

            let message = config.validate().unwrap_err().to_string();
            assert!(message.contains("literal path"), "{}: {}", path, message);
        }
    }

    #[test]
    fn test_local_timezone_alias_is_valid() {
        let mut config = Config::default();
        config.time.default_timezone = "local".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[metrics]\nport = 8080\n").unwrap();

        let mut config = Config::from_file(&path).unwrap();
        config.apply_env(env(&[])).unwrap();
        config.validate().unwrap();
        assert_eq!(config.metrics.port, 8080);
        assert!(!config.metrics.separate_listener(config.server.port));
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = Config::load(
            Some(Path::new("/nonexistent/path/config.toml")),
            &Overrides::default(),
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }
}
