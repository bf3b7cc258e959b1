use std::fmt;

use rmcp::schemars;
use serde::{Deserialize, Deserializer, Serialize};

/// Helper function to deserialize and trim strings
fn deserialize_trimmed_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(s.trim().to_string())
}

/// Trim optional strings, treating blank values as absent
fn deserialize_trimmed_option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    Ok(s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

/// Request to get the current time
#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct GetTimeRequest {
    /// IANA timezone name (e.g., 'America/New_York', 'Europe/London'). Defaults to the server's default timezone
    #[serde(default, deserialize_with = "deserialize_trimmed_option")]
    pub timezone: Option<String>,
    /// Desired output format (RFC3339, RFC3339Nano, Unix, UnixMilli, UnixMicro, UnixNano, or Layout). Defaults to the server's default format
    #[serde(default, deserialize_with = "deserialize_trimmed_option")]
    pub format: Option<String>,
}

/// Timestamp accepted by `format_time`
#[derive(Debug, Clone, PartialEq, Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum TimestampInput {
    /// Unix timestamp in seconds
    Seconds(f64),
    /// Formatted date/time (RFC3339, ISO 8601, `YYYY-MM-DD HH:MM:SS`, or digits as Unix seconds)
    Text(String),
}

impl fmt::Display for TimestampInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampInput::Seconds(seconds) => write!(f, "{}", seconds),
            TimestampInput::Text(text) => f.write_str(text),
        }
    }
}

/// Request to format a timestamp
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FormatTimeRequest {
    /// Timestamp to format (Unix timestamp as number, RFC3339 string, or ISO 8601 string)
    pub timestamp: TimestampInput,
    /// Desired output format (RFC3339, RFC3339Nano, Unix, UnixMilli, UnixMicro, UnixNano, or Layout)
    #[serde(deserialize_with = "deserialize_trimmed_string")]
    pub format: String,
    /// IANA timezone name for output. Defaults to the server's default timezone
    #[serde(default, deserialize_with = "deserialize_trimmed_option")]
    pub timezone: Option<String>,
}

/// Request to parse a time string
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ParseTimeRequest {
    /// Time string to parse
    #[serde(deserialize_with = "deserialize_trimmed_string")]
    pub time_string: String,
    /// Expected time format (RFC3339, Unix, etc.). If not provided, the format is auto-detected
    #[serde(default, deserialize_with = "deserialize_trimmed_option")]
    pub format: Option<String>,
    /// IANA timezone name for parsing. Defaults to the server's default timezone
    #[serde(default, deserialize_with = "deserialize_trimmed_option")]
    pub timezone: Option<String>,
}

/// Request for timezone information
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TimezoneInfoRequest {
    /// IANA timezone name to describe (e.g., 'America/New_York', 'Europe/London')
    #[serde(deserialize_with = "deserialize_trimmed_string")]
    pub timezone: String,
    /// Optional reference time (RFC3339) for the calculation. Defaults to now
    #[serde(default, deserialize_with = "deserialize_trimmed_option")]
    pub reference_time: Option<String>,
}

/// Result of `get_time`
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetTimeResult {
    /// The current time formatted according to the requested format
    pub formatted_time: String,
    /// The timezone used for formatting
    pub timezone: String,
    /// The format used for the time string
    pub format: String,
    /// Unix timestamp in seconds
    pub unix_timestamp: i64,
}

/// Result of `format_time`
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct FormatTimeResult {
    /// The formatted time string
    pub formatted_time: String,
    /// The timezone used for formatting
    pub timezone: String,
    /// The format used for the time string
    pub format: String,
    /// Unix timestamp in seconds
    pub unix_timestamp: i64,
}

/// Result of `parse_time`
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ParseTimeResult {
    /// Unix timestamp in seconds
    pub unix_timestamp: i64,
    /// Time in RFC3339 format
    pub rfc3339: String,
    /// The timezone of the parsed time
    pub timezone: String,
    /// Whether the time is in daylight saving time
    pub is_dst: bool,
}

/// Daylight-saving period bounding a reference instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DstPeriod {
    /// First instant of the period (RFC3339)
    pub start: String,
    /// First instant after the period (RFC3339)
    pub end: String,
    /// Offset added during the period, e.g. "+1h"
    pub saving: String,
    /// Offset added during the period in seconds
    pub saving_seconds: i64,
}

/// Next DST change after the reference instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DstTransition {
    /// Instant of the change (RFC3339)
    pub next_transition: String,
    /// "enter_dst" or "exit_dst"
    pub transition_type: String,
    /// Change of the UTC offset in seconds
    pub offset_change: i64,
}

/// Result of `timezone_info`
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TimezoneInfo {
    /// IANA timezone name
    pub name: String,
    /// Abbreviation in effect at the reference time (e.g. "EST")
    pub abbreviation: String,
    /// UTC offset as ±HH:MM
    pub offset: String,
    /// UTC offset in seconds
    pub offset_seconds: i64,
    /// Whether daylight saving time is in effect at the reference time
    pub is_dst: bool,
    /// Active or upcoming DST period, absent for zones without DST
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst: Option<DstPeriod>,
    /// Next DST transition, absent for zones without DST
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_transition: Option<DstTransition>,
}
