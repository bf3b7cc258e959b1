//! Utility modules for the time MCP server
//!
//! - `logging`: tracing subscriber setup

pub mod logging;
