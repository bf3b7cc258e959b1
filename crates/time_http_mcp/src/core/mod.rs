//! # Time MCP Server Core
//!
//! Timezone-aware time operations behind the MCP tools.
//!
//! ## Modules
//! - `dst`: daylight-saving transition search
//! - `error`: domain errors and their MCP mapping
//! - `format`: output formats, strict parsing and auto-detection
//! - `models`: tool request and result documents
//! - `provider`: the four time operations
//! - `utils`: offset and duration rendering helpers

pub mod dst;
pub mod error;
pub mod format;
pub mod models;
pub mod provider;
pub mod utils;
