use std::sync::Arc;
use std::time::Instant;

use chrono::DateTime;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{
        router::{prompt::PromptRouter, tool::ToolRouter},
        wrapper::Parameters,
    },
    model::*,
    prompt, prompt_handler, prompt_router,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use serde::Serialize;

use crate::config::Config;
use crate::core::{
    error::{McpResult, TimeServerError, TimeServerResult},
    format::TimeFormat,
    models::{FormatTimeRequest, GetTimeRequest, ParseTimeRequest, TimezoneInfoRequest},
    provider::TimeServer,
};
use crate::metrics::{Metrics, Outcome};

/// Instant used to illustrate each format in `time://formats`
const FORMAT_EXAMPLE_TIMESTAMP: i64 = 1_720_094_400;

const COMMON_TIMEZONES: &[(&str, &[(&str, &str)])] = &[
    (
        "AMERICAS",
        &[
            ("America/New_York", "Eastern Time"),
            ("America/Chicago", "Central Time"),
            ("America/Denver", "Mountain Time"),
            ("America/Phoenix", "Mountain Time, no DST"),
            ("America/Los_Angeles", "Pacific Time"),
            ("America/Anchorage", "Alaska Time"),
            ("America/Toronto", "Eastern Time, Canada"),
            ("America/Mexico_City", "Central Time, Mexico"),
            ("America/Sao_Paulo", "Brasilia Time"),
            ("America/Santiago", "Chile Time, southern DST"),
        ],
    ),
    (
        "EUROPE & AFRICA",
        &[
            ("Europe/London", "GMT / BST"),
            ("Europe/Dublin", "GMT / IST"),
            ("Europe/Paris", "CET / CEST"),
            ("Europe/Berlin", "CET / CEST"),
            ("Europe/Helsinki", "EET / EEST"),
            ("Europe/Istanbul", "Turkey Time"),
            ("Europe/Moscow", "Moscow Time"),
            ("Africa/Cairo", "Eastern European Time"),
            ("Africa/Lagos", "West Africa Time"),
            ("Africa/Johannesburg", "South Africa Time"),
        ],
    ),
    (
        "ASIA & PACIFIC",
        &[
            ("Asia/Dubai", "Gulf Time"),
            ("Asia/Kolkata", "India Time, UTC+05:30"),
            ("Asia/Kathmandu", "Nepal Time, UTC+05:45"),
            ("Asia/Shanghai", "China Time"),
            ("Asia/Singapore", "Singapore Time"),
            ("Asia/Tokyo", "Japan Time"),
            ("Australia/Adelaide", "Central Australia, half-hour DST zone"),
            ("Australia/Sydney", "Eastern Australia, southern DST"),
            ("Australia/Lord_Howe", "30 minute DST saving"),
            ("Pacific/Auckland", "New Zealand Time"),
        ],
    ),
    ("SPECIAL", &[("UTC", "Coordinated Universal Time")]),
];

/// MCP service exposing the time tools over any rmcp transport
#[derive(Clone)]
pub struct TimeService {
    time_server: TimeServer,
    config: Arc<Config>,
    metrics: Arc<Metrics>,
    tool_router: ToolRouter<TimeService>,
    prompt_router: PromptRouter<TimeService>,
}

impl TimeService {
    pub fn new(config: Arc<Config>, metrics: Arc<Metrics>) -> Self {
        Self {
            time_server: TimeServer::new(&config.time),
            config,
            metrics,
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        }
    }

    fn create_resource_text(&self, uri: &str, name: &str) -> Resource {
        RawResource::new(uri, name.to_string()).no_annotation()
    }

    /// Record metrics for one tool call and log failures
    fn observe<T>(
        &self,
        tool: &'static str,
        operation: &'static str,
        started: Instant,
        result: TimeServerResult<T>,
    ) -> McpResult<T> {
        self.metrics
            .observe_tool(tool, operation, Outcome::from_result(&result), started.elapsed());
        result.map_err(|err| {
            tracing::error!(tool, code = err.code(), error = %err, "{} failed", tool);
            err.into()
        })
    }

    fn supported_format_names(&self) -> String {
        self.time_server
            .supported_formats()
            .iter()
            .map(TimeFormat::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn generate_status_content(&self) -> McpResult<String> {
        let now = self
            .time_server
            .get_current_time(None, None)
            .map_err(McpError::from)?;
        let metrics_endpoint = if !self.config.metrics.enabled {
            "disabled".to_string()
        } else if self.config.metrics.separate_listener(self.config.server.port) {
            format!(
                "{}:{}{}",
                self.config.server.host, self.config.metrics.port, self.config.metrics.path
            )
        } else {
            self.config.metrics.path.clone()
        };

        Ok(format!(
            r#"Time MCP Server Status

Server: {} v{}
Listening: {}
Default Timezone: {}
Default Format: {}
Current Time: {}
Supported Formats: {}
Tools Available: 4
Prompts Available: 1
Resources Available: 4

Endpoints:
- SSE: /sse (messages: /message)
- Streamable HTTP: /streamable (alias: /mcp)
- Health: /health
- Metrics: {}"#,
            self.config.server.name,
            self.config.server.version,
            self.config.server.bind_address(),
            now.timezone,
            now.format,
            now.formatted_time,
            self.supported_format_names(),
            metrics_endpoint
        ))
    }

    fn generate_help_content(&self) -> String {
        format!(
            r#"Time MCP Server Help

TOOLS:
- get_time: Get the current time in a timezone and format
  - timezone: IANA timezone name (optional, default {})
  - format: output format (optional, default {})
  - Example: {{"timezone": "America/New_York", "format": "RFC3339"}}

- format_time: Format a timestamp into a format and timezone
  - timestamp: Unix seconds as a number, or a date/time string (required)
  - format: output format (required)
  - timezone: IANA timezone name (optional)
  - Example: {{"timestamp": 1720094400, "format": "Layout", "timezone": "Asia/Tokyo"}}

- parse_time: Parse a time string into timestamp information
  - time_string: the text to parse (required)
  - format: expected format (optional, auto-detected when omitted)
  - timezone: zone for wall-clock input without an offset (optional)
  - Example: {{"time_string": "2024-07-04 08:00:00", "timezone": "America/New_York"}}

- timezone_info: Offset, abbreviation and DST details for a timezone
  - timezone: IANA timezone name (required)
  - reference_time: instant to evaluate at (optional, default now)
  - Example: {{"timezone": "Europe/London", "reference_time": "2024-01-15T00:00:00Z"}}

FORMATS: {}

AUTO-DETECTION (parse_time without format, string timestamps in format_time):
1. RFC3339 with offset or Z
2. Layout: YYYY-MM-DD HH:MM:SS ±HHMM
3. ISO wall time: YYYY-MM-DDTHH:MM:SS
4. Wall time: YYYY-MM-DD HH:MM:SS
5. Date only: YYYY-MM-DD (midnight)
6. All digits: Unix seconds

Wall times are read in the request timezone by parse_time and in UTC by
format_time. A wall time skipped by a DST change fails to parse; a repeated
one resolves to its earlier instant.

PROMPTS:
- timezone_guidance: Best practices for timezone handling

RESOURCES:
- time://status: Server status and current time
- time://help: This help documentation
- time://formats: Supported formats with examples
- time://timezones: Common IANA timezone names"#,
            self.time_server.default_timezone().name(),
            self.time_server.default_format.as_str(),
            self.supported_format_names()
        )
    }

    fn generate_formats_content(&self) -> String {
        let timezone = self.time_server.default_timezone();
        let example = DateTime::from_timestamp(FORMAT_EXAMPLE_TIMESTAMP, 0)
            .unwrap_or_default()
            .with_timezone(&timezone);

        let mut content = format!(
            "Supported Time Formats\n\nExamples render {} in {}.\n\n",
            TimeFormat::Rfc3339.render(&example.with_timezone(&chrono_tz::UTC)),
            timezone.name()
        );
        for format in self.time_server.supported_formats() {
            let marker = if *format == self.time_server.default_format {
                " (default)"
            } else {
                ""
            };
            content.push_str(&format!(
                "- {}{}: {}\n",
                format.as_str(),
                marker,
                format.render(&example)
            ));
        }
        content.push_str("\nFormat names are case-insensitive.");
        content
    }

    fn generate_timezone_list_content(&self) -> String {
        let mut content = String::from("Common IANA Timezone Names\n");
        for (region, zones) in COMMON_TIMEZONES {
            content.push_str(&format!("\n{}:\n", region));
            for (name, description) in *zones {
                content.push_str(&format!("- {} ({})\n", name, description));
            }
        }
        content.push_str(
            "\nAny name from the IANA timezone database is accepted. Abbreviations such \
             as EST or PST are ambiguous and rejected.",
        );
        content
    }
}

/// Text summary followed by the JSON result document
fn tool_output<T: Serialize>(summary: String, result: &T) -> McpResult<CallToolResult> {
    let json = serde_json::to_string_pretty(result)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![
        Content::text(summary),
        Content::text(json),
    ]))
}

#[tool_router]
impl TimeService {
    #[tool(description = "Get current time in a specified timezone and format")]
    pub(crate) async fn get_time(
        &self,
        Parameters(req): Parameters<GetTimeRequest>,
    ) -> McpResult<CallToolResult> {
        let started = Instant::now();
        let result = self.observe(
            "get_time",
            "get_current_time",
            started,
            self.time_server
                .get_current_time(req.timezone.as_deref(), req.format.as_deref()),
        )?;

        tool_output(
            format!(
                "Current time: {}\nTimezone: {}\nFormat: {}",
                result.formatted_time, result.timezone, result.format
            ),
            &result,
        )
    }

    #[tool(description = "Format a timestamp into a specified format and timezone")]
    pub(crate) async fn format_time(
        &self,
        Parameters(req): Parameters<FormatTimeRequest>,
    ) -> McpResult<CallToolResult> {
        let started = Instant::now();
        let result = self.observe(
            "format_time",
            "format_time",
            started,
            self.time_server
                .format_time(&req.timestamp, &req.format, req.timezone.as_deref()),
        )?;

        tool_output(
            format!(
                "Formatted time: {}\nOriginal: {}\nTimezone: {}\nFormat: {}",
                result.formatted_time, req.timestamp, result.timezone, result.format
            ),
            &result,
        )
    }

    #[tool(description = "Parse a time string and return timestamp information")]
    pub(crate) async fn parse_time(
        &self,
        Parameters(req): Parameters<ParseTimeRequest>,
    ) -> McpResult<CallToolResult> {
        let started = Instant::now();
        let result = self.observe(
            "parse_time",
            "parse_time",
            started,
            self.time_server.parse_time(
                &req.time_string,
                req.format.as_deref(),
                req.timezone.as_deref(),
            ),
        )?;

        tool_output(
            format!(
                "Parsed time:\n- Unix timestamp: {}\n- RFC3339: {}\n- Timezone: {}\n- Is DST: {}",
                result.unix_timestamp, result.rfc3339, result.timezone, result.is_dst
            ),
            &result,
        )
    }

    #[tool(description = "Get detailed information about a timezone")]
    pub(crate) async fn timezone_info(
        &self,
        Parameters(req): Parameters<TimezoneInfoRequest>,
    ) -> McpResult<CallToolResult> {
        let started = Instant::now();
        let result = self.observe(
            "timezone_info",
            "get_timezone_info",
            started,
            self.time_server
                .get_timezone_info(&req.timezone, req.reference_time.as_deref()),
        )?;

        let dst_summary = match &result.dst {
            Some(period) => format!(
                "DST: {} to {} (saving {})",
                period.start, period.end, period.saving
            ),
            None => "No DST transitions".to_string(),
        };

        tool_output(
            format!(
                "Timezone: {}\nAbbreviation: {}\nOffset: {}\nCurrent DST: {}\n{}",
                result.name, result.abbreviation, result.offset, result.is_dst, dst_summary
            ),
            &result,
        )
    }
}

#[prompt_router]
impl TimeService {
    /// Generate guidance for effective timezone usage
    #[prompt(name = "timezone_guidance")]
    async fn timezone_guidance(
        &self,
        _ctx: RequestContext<RoleServer>,
    ) -> McpResult<Vec<PromptMessage>> {
        let guidance = format!(
            r#"Timezone Best Practices:

1. **IANA Timezone Names**
   - Use full names such as 'America/New_York' or 'Europe/London'
   - Abbreviations like 'EST' or 'PST' are ambiguous and rejected
   - When no timezone is given the server uses: {}

2. **Choosing a Format**
   - RFC3339 for human-readable exchange, RFC3339Nano when sub-second precision matters
   - Unix, UnixMilli, UnixMicro, UnixNano for arithmetic and storage
   - Layout ('2024-07-04 08:00:00 -0400') for logs and reports
   - Supported here: {}

3. **Parsing Input**
   - Prefer strings carrying an offset ('2024-07-04T08:00:00-04:00')
   - Wall times without an offset are read in the request timezone
   - Times skipped by a spring-forward change do not exist and fail to parse
   - Times repeated by a fall-back change resolve to the earlier instant

4. **Daylight Saving Time**
   - Use timezone_info to see the active or next DST period and the next transition
   - Pass reference_time to inspect a past or future date
   - Not every saving is one hour (Australia/Lord_Howe saves 30 minutes)

5. **Storage**
   - Store instants in UTC or as Unix timestamps
   - Convert to a local zone only for display"#,
            self.time_server.default_timezone().name(),
            self.supported_format_names()
        );

        Ok(vec![PromptMessage {
            role: PromptMessageRole::Assistant,
            content: PromptMessageContent::text(guidance),
        }])
    }
}

#[tool_handler]
#[prompt_handler]
impl ServerHandler for TimeService {
    fn get_info(&self) -> ServerInfo {
        let mut server_info = Implementation::from_build_env();
        server_info.name = self.config.server.name.clone();
        server_info.version = self.config.server.version.clone();

        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder()
                .enable_prompts()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info,
            instructions: Some(format!(
                "Time MCP Server for time queries. Tools: get_time, format_time, parse_time, timezone_info. Default timezone: {}. Use IANA timezone names.",
                self.time_server.default_timezone().name()
            )),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _: RequestContext<RoleServer>,
    ) -> McpResult<ListResourcesResult> {
        Ok(ListResourcesResult {
            resources: vec![
                self.create_resource_text("time://status", "server-status"),
                self.create_resource_text("time://help", "help-documentation"),
                self.create_resource_text("time://formats", "format-list"),
                self.create_resource_text("time://timezones", "timezone-list"),
            ],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri }: ReadResourceRequestParam,
        _: RequestContext<RoleServer>,
    ) -> McpResult<ReadResourceResult> {
        let text = match uri.as_str() {
            "time://status" => self.generate_status_content()?,
            "time://help" => self.generate_help_content(),
            "time://formats" => self.generate_formats_content(),
            "time://timezones" => self.generate_timezone_list_content(),
            _ => {
                return Err(TimeServerError::ResourceNotFound {
                    uri: uri.to_string(),
                }
                .into());
            }
        };
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, uri)],
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _: RequestContext<RoleServer>,
    ) -> McpResult<ListResourceTemplatesResult> {
        Ok(ListResourceTemplatesResult {
            next_cursor: None,
            resource_templates: Vec::new(),
        })
    }

    async fn initialize(
        &self,
        request: InitializeRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> McpResult<InitializeResult> {
        tracing::info!(
            client = %request.client_info.name,
            client_version = %request.client_info.version,
            "MCP session initialized"
        );
        Ok(self.get_info())
    }
}
