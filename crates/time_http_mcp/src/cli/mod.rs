use std::path::PathBuf;

use clap::Parser;

use crate::config::{Config, Overrides};
use crate::errors::TimeMcpResult;

/// Time MCP Server over HTTP
///
/// Serves the time tools over the MCP SSE and streamable HTTP transports,
/// with health and Prometheus metrics endpoints alongside.
///
/// ## Development
/// ```bash
/// cargo run --bin mcp-server-time-http -- --port 8080
/// npx @modelcontextprotocol/inspector  # connect to http://localhost:8080/mcp
/// ```
///
/// ## Environment Variables
/// - `MCP_TIME_CONFIG`: configuration file when `--config` is not given
/// - `MCP_TIME_<SECTION>_<KEY>`: override a single setting, e.g. `MCP_TIME_SERVER_PORT`
/// - `RUST_LOG`: overrides the configured log level
#[derive(Parser, Debug, Clone)]
#[command(name = "mcp-server-time-http")]
#[command(about = "A time MCP server over SSE and streamable HTTP")]
#[command(version)]
#[command(
    long_about = "A Model Context Protocol (MCP) server providing current time, formatting, parsing and timezone information. \nServes the SSE transport on /sse and the streamable HTTP transport on /streamable and /mcp, plus /health and metrics."
)]
pub struct Cli {
    /// TOML configuration file. Must exist when given.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address to bind, overriding `server.host`
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port to bind, overriding `server.port`
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,
}

impl Cli {
    /// Parse CLI arguments and load the layered configuration
    pub fn parse_config() -> TimeMcpResult<Config> {
        Self::parse().into_config()
    }

    pub fn into_config(self) -> TimeMcpResult<Config> {
        let overrides = Overrides {
            host: self.host,
            port: self.port,
        };
        Config::load(self.config.as_deref(), &overrides)
    }
}
