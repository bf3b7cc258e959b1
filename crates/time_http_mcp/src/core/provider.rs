use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::config::TimeConfig;
use crate::core::{
    dst,
    error::{TimeServerError, TimeServerResult},
    format::{self, TimeFormat},
    models::{
        DstPeriod, DstTransition, FormatTimeResult, GetTimeResult, ParseTimeResult,
        TimestampInput, TimezoneInfo,
    },
    utils,
};

/// Name accepted in configuration for "the host's timezone"
pub const LOCAL_TIMEZONE_ALIAS: &str = "Local";

/// Time query operations over the IANA timezone database
#[derive(Debug, Clone)]
pub struct TimeServer {
    pub(crate) default_timezone: Tz,
    pub(crate) default_format: TimeFormat,
    pub(crate) supported_formats: Vec<TimeFormat>,
}

impl TimeServer {
    /// Build from validated configuration.
    ///
    /// An unresolvable default timezone falls back to UTC with a warning;
    /// configuration validation normally rejects it before we get here.
    pub fn new(config: &TimeConfig) -> Self {
        let default_timezone = resolve_default_timezone(&config.default_timezone);
        let supported_formats = if config.supported_formats.is_empty() {
            TimeFormat::ALL.to_vec()
        } else {
            config.supported_formats.clone()
        };

        Self {
            default_timezone,
            default_format: config.default_format,
            supported_formats,
        }
    }

    pub fn default_timezone(&self) -> Tz {
        self.default_timezone
    }

    pub fn supported_formats(&self) -> &[TimeFormat] {
        &self.supported_formats
    }

    pub(crate) fn parse_timezone(&self, timezone_name: &str) -> TimeServerResult<Tz> {
        Tz::from_str(timezone_name).map_err(|_| TimeServerError::invalid_timezone(timezone_name))
    }

    fn resolve_timezone(&self, timezone_name: Option<&str>) -> TimeServerResult<Tz> {
        match timezone_name {
            Some(name) => self.parse_timezone(name),
            None => Ok(self.default_timezone),
        }
    }

    pub(crate) fn resolve_format(&self, format_name: &str) -> TimeServerResult<TimeFormat> {
        let invalid = || TimeServerError::InvalidFormat {
            format: format_name.to_string(),
            supported: self.supported_formats.clone(),
        };
        let format = TimeFormat::from_str(format_name).map_err(|_| invalid())?;
        if self.supported_formats.contains(&format) {
            Ok(format)
        } else {
            Err(invalid())
        }
    }

    pub fn get_current_time(
        &self,
        timezone_name: Option<&str>,
        format_name: Option<&str>,
    ) -> TimeServerResult<GetTimeResult> {
        let timezone = self.resolve_timezone(timezone_name)?;
        let format = match format_name {
            Some(name) => self.resolve_format(name)?,
            None => self.default_format,
        };
        let now = Utc::now().with_timezone(&timezone);

        Ok(GetTimeResult {
            formatted_time: format.render(&now),
            timezone: timezone.name().to_string(),
            format: format.to_string(),
            unix_timestamp: now.timestamp(),
        })
    }

    pub fn format_time(
        &self,
        timestamp: &TimestampInput,
        format_name: &str,
        timezone_name: Option<&str>,
    ) -> TimeServerResult<FormatTimeResult> {
        let timezone = self.resolve_timezone(timezone_name)?;
        let format = self.resolve_format(format_name)?;

        let instant = match timestamp {
            TimestampInput::Seconds(seconds) => format::from_epoch_seconds(*seconds)
                .ok_or_else(|| TimeServerError::parse_failure(seconds.to_string()))?,
            TimestampInput::Text(text) => {
                format::auto_detect(text, &chrono_tz::UTC)?.with_timezone(&Utc)
            }
        };
        let local = instant.with_timezone(&timezone);

        Ok(FormatTimeResult {
            formatted_time: format.render(&local),
            timezone: timezone.name().to_string(),
            format: format.to_string(),
            unix_timestamp: local.timestamp(),
        })
    }

    pub fn parse_time(
        &self,
        time_string: &str,
        format_name: Option<&str>,
        timezone_name: Option<&str>,
    ) -> TimeServerResult<ParseTimeResult> {
        let timezone = self.resolve_timezone(timezone_name)?;
        let parsed = match format_name {
            Some(name) => self.resolve_format(name)?.parse(time_string, &timezone)?,
            None => format::auto_detect(time_string, &timezone)?,
        };

        Ok(ParseTimeResult {
            unix_timestamp: parsed.timestamp(),
            rfc3339: TimeFormat::Rfc3339.render(&parsed),
            timezone: timezone.name().to_string(),
            is_dst: dst::is_dst(&timezone, parsed.with_timezone(&Utc)),
        })
    }

    pub fn get_timezone_info(
        &self,
        timezone_name: &str,
        reference_time: Option<&str>,
    ) -> TimeServerResult<TimezoneInfo> {
        let timezone = self.parse_timezone(timezone_name)?;
        let reference = match reference_time {
            Some(text) => format::auto_detect(text, &chrono_tz::UTC)?.with_timezone(&Utc),
            None => Utc::now(),
        };
        Ok(describe_timezone(&timezone, reference))
    }
}

/// Offset, abbreviation and DST data for `timezone` at `reference`
fn describe_timezone(timezone: &Tz, reference: DateTime<Utc>) -> TimezoneInfo {
    let local = reference.with_timezone(timezone);
    let offset_seconds = dst::offset_at(timezone, reference);
    let render = |at: DateTime<Utc>| TimeFormat::Rfc3339.render(&at.with_timezone(timezone));

    let dst = dst::saving_period(timezone, reference).map(|period| DstPeriod {
        start: render(period.start),
        end: render(period.end),
        saving: utils::format_time_difference(period.saving_seconds as f64 / 3600.0),
        saving_seconds: period.saving_seconds,
    });

    let dst_transition = dst::next_transition(timezone, reference).map(|transition| DstTransition {
        next_transition: render(transition.at),
        transition_type: if transition.enters_dst() {
            "enter_dst".to_string()
        } else {
            "exit_dst".to_string()
        },
        offset_change: transition.offset_change(),
    });

    TimezoneInfo {
        name: timezone.name().to_string(),
        abbreviation: local.offset().to_string(),
        offset: utils::format_utc_offset(offset_seconds),
        offset_seconds,
        is_dst: dst::is_dst(timezone, reference),
        dst,
        dst_transition,
    }
}

fn resolve_default_timezone(name: &str) -> Tz {
    if name.eq_ignore_ascii_case(LOCAL_TIMEZONE_ALIAS) {
        return detect_local_timezone();
    }
    name.parse::<Tz>().unwrap_or_else(|_| {
        tracing::warn!("Could not parse default timezone '{}', defaulting to UTC", name);
        chrono_tz::UTC
    })
}

/// Try to detect the system's local timezone
pub fn detect_local_timezone() -> Tz {
    match iana_time_zone::get_timezone() {
        Ok(tz_name) => match tz_name.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                tracing::warn!("Could not parse timezone '{}', defaulting to UTC", tz_name);
                chrono_tz::UTC
            }
        },
        Err(_) => {
            tracing::warn!("Could not detect system timezone, defaulting to UTC");
            chrono_tz::UTC
        }
    }
}

impl Default for TimeServer {
    fn default() -> Self {
        Self::new(&TimeConfig::default())
    }
}
