/// Available resource URIs for the Time MCP Server
pub const AVAILABLE_RESOURCES: &[&str] = &[
    "time://status",
    "time://help",
    "time://formats",
    "time://timezones",
];

/// Format an offset difference in hours
///
/// # Arguments
///
/// * `hours_difference` - The difference in hours
///
/// # Returns
///
/// A compact signed string such as `+1h` or `-2.75h`
pub fn format_time_difference(hours_difference: f64) -> String {
    match hours_difference.fract() {
        0.0 => format!("{:+.0}h", hours_difference),
        _ => {
            let formatted = format!("{:+}", hours_difference);
            let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
            format!("{}h", trimmed)
        }
    }
}

/// Format an offset in seconds as `±HH:MM`
pub fn format_utc_offset(offset_seconds: i64) -> String {
    let sign = if offset_seconds < 0 { '-' } else { '+' };
    let minutes = offset_seconds.abs() / 60;
    format!("{}{:02}:{:02}", sign, minutes / 60, minutes % 60)
}
