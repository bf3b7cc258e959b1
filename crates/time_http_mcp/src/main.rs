mod app;
mod cli;
mod config;
mod core;
mod errors;
mod http;
mod metrics;
mod server;
mod utils;

use std::process::ExitCode;

use app::App;
use cli::Cli;
use utils::logging;

/// Time MCP Server over HTTP
///
/// Usage: mcp-server-time-http [--config FILE] [--host HOST] [--port PORT]
#[tokio::main]
async fn main() -> ExitCode {
    // Configuration comes first: it decides the log level and format
    let config = match Cli::parse_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_logging(&config.logging) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        default_timezone = %config.time.default_timezone,
        "Starting Time MCP server"
    );

    if let Err(e) = App::new(config).run().await {
        tracing::error!("Time MCP server failed: {}", e);
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
