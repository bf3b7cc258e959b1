use rmcp::ErrorData as McpError;
use rmcp::serde_json::json;

use crate::core::format::TimeFormat;

// Error codes
const ERROR_INVALID_TIMEZONE: &str = "invalid_timezone";
const ERROR_INVALID_FORMAT: &str = "invalid_format";
const ERROR_PARSE_FAILURE: &str = "parse_failure";
const ERROR_RESOURCE_NOT_FOUND: &str = "resource_not_found";

/// Errors produced by the time query operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeServerError {
    #[error("Invalid timezone: {timezone}")]
    InvalidTimezone { timezone: String },
    #[error("Invalid format: {format}")]
    InvalidFormat {
        format: String,
        supported: Vec<TimeFormat>,
    },
    #[error("Failed to parse time: {input}")]
    ParseFailure { input: String },
    #[error("Resource not found: {uri}")]
    ResourceNotFound { uri: String },
}

impl TimeServerError {
    pub(crate) fn invalid_timezone(timezone: impl Into<String>) -> Self {
        Self::InvalidTimezone {
            timezone: timezone.into(),
        }
    }

    pub(crate) fn parse_failure(input: impl Into<String>) -> Self {
        Self::ParseFailure {
            input: input.into(),
        }
    }

    /// Short machine-readable code, also used as metrics/log label
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTimezone { .. } => ERROR_INVALID_TIMEZONE,
            Self::InvalidFormat { .. } => ERROR_INVALID_FORMAT,
            Self::ParseFailure { .. } => ERROR_PARSE_FAILURE,
            Self::ResourceNotFound { .. } => ERROR_RESOURCE_NOT_FOUND,
        }
    }
}

impl From<TimeServerError> for McpError {
    fn from(err: TimeServerError) -> Self {
        let message = err.to_string();
        match err {
            TimeServerError::InvalidTimezone { timezone } => McpError::invalid_params(
                ERROR_INVALID_TIMEZONE,
                Some(json!({"timezone": timezone, "message": message})),
            ),
            TimeServerError::InvalidFormat { format, supported } => McpError::invalid_params(
                ERROR_INVALID_FORMAT,
                Some(json!({
                    "format": format,
                    "supported_formats": supported.iter().map(TimeFormat::as_str).collect::<Vec<_>>(),
                    "message": message
                })),
            ),
            TimeServerError::ParseFailure { input } => McpError::invalid_params(
                ERROR_PARSE_FAILURE,
                Some(json!({"input": input, "message": message})),
            ),
            TimeServerError::ResourceNotFound { uri } => McpError::resource_not_found(
                ERROR_RESOURCE_NOT_FOUND,
                Some(json!({
                    "uri": uri,
                    "available_resources": crate::core::utils::AVAILABLE_RESOURCES
                })),
            ),
        }
    }
}

pub type TimeServerResult<T> = Result<T, TimeServerError>;
pub type McpResult<T> = Result<T, McpError>;
