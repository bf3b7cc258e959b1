use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::error::{TimeServerError, TimeServerResult};

/// `Layout` rendering, e.g. `2024-07-04 08:00:00 -0400`
pub const LAYOUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";
/// Wall-clock variants accepted while auto-detecting
const ISO_WALL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const SPACED_WALL_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Output/input formats understood by the time tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeFormat {
    Rfc3339,
    Rfc3339Nano,
    Unix,
    UnixMilli,
    UnixMicro,
    UnixNano,
    Layout,
}

impl TimeFormat {
    pub const ALL: [TimeFormat; 7] = [
        TimeFormat::Rfc3339,
        TimeFormat::Rfc3339Nano,
        TimeFormat::Unix,
        TimeFormat::UnixMilli,
        TimeFormat::UnixMicro,
        TimeFormat::UnixNano,
        TimeFormat::Layout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFormat::Rfc3339 => "RFC3339",
            TimeFormat::Rfc3339Nano => "RFC3339Nano",
            TimeFormat::Unix => "Unix",
            TimeFormat::UnixMilli => "UnixMilli",
            TimeFormat::UnixMicro => "UnixMicro",
            TimeFormat::UnixNano => "UnixNano",
            TimeFormat::Layout => "Layout",
        }
    }

    /// Subdivisions of a second for the integer epoch formats
    fn epoch_units_per_second(&self) -> Option<i128> {
        match self {
            TimeFormat::Unix => Some(1),
            TimeFormat::UnixMilli => Some(1_000),
            TimeFormat::UnixMicro => Some(1_000_000),
            TimeFormat::UnixNano => Some(1_000_000_000),
            _ => None,
        }
    }

    /// Render an instant in this format
    pub fn render(&self, dt: &DateTime<Tz>) -> String {
        match self {
            TimeFormat::Rfc3339 => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
            TimeFormat::Rfc3339Nano => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            TimeFormat::Layout => dt.format(LAYOUT_FORMAT).to_string(),
            epoch => {
                let units = epoch.epoch_units_per_second().unwrap_or(1);
                let nanos = i128::from(dt.timestamp()) * 1_000_000_000
                    + i128::from(dt.timestamp_subsec_nanos());
                nanos.div_euclid(1_000_000_000 / units).to_string()
            }
        }
    }

    /// Parse `input` strictly against this format. Wall times without an
    /// offset are read in `tz`.
    pub fn parse(&self, input: &str, tz: &Tz) -> TimeServerResult<DateTime<Tz>> {
        let parsed = match self {
            TimeFormat::Rfc3339 | TimeFormat::Rfc3339Nano => parse_rfc3339(input),
            TimeFormat::Layout => DateTime::parse_from_str(input, LAYOUT_FORMAT)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
                .or_else(|| parse_wall(input, SPACED_WALL_FORMAT, tz)),
            epoch => {
                let units = epoch.epoch_units_per_second().unwrap_or(1);
                parse_epoch(input, units)
            }
        };

        parsed
            .map(|dt| dt.with_timezone(tz))
            .ok_or_else(|| TimeServerError::parse_failure(input))
    }
}

impl fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeFormat {
    type Err = TimeServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        TimeFormat::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| TimeServerError::InvalidFormat {
                format: name.to_string(),
                supported: TimeFormat::ALL.to_vec(),
            })
    }
}

impl Serialize for TimeFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TimeFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Try every accepted layout in priority order.
///
/// Wall times without an offset are interpreted in `tz`.
pub fn auto_detect(input: &str, tz: &Tz) -> TimeServerResult<DateTime<Tz>> {
    let input = input.trim();

    parse_rfc3339(input)
        .or_else(|| {
            DateTime::parse_from_str(input, LAYOUT_FORMAT)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
        .or_else(|| parse_wall(input, ISO_WALL_FORMAT, tz))
        .or_else(|| parse_wall(input, SPACED_WALL_FORMAT, tz))
        .or_else(|| {
            NaiveDate::parse_from_str(input, DATE_FORMAT)
                .ok()
                .and_then(|date| resolve_wall(date.and_hms_opt(0, 0, 0)?, tz))
        })
        .or_else(|| parse_epoch(input, 1))
        .map(|dt| dt.with_timezone(tz))
        .ok_or_else(|| TimeServerError::parse_failure(input))
}

/// Build an instant from fractional epoch seconds
pub fn from_epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp(whole as i64, nanos)
}

fn parse_rfc3339(input: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(input)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_wall(input: &str, layout: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(input, layout).ok()?;
    resolve_wall(naive, tz)
}

/// Gaps yield nothing, folds take the earlier instant
fn resolve_wall(naive: NaiveDateTime, tz: &Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_epoch(input: &str, units_per_second: i128) -> Option<DateTime<Utc>> {
    let digits = input.strip_prefix(['-', '+']).unwrap_or(input);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: i128 = input.parse().ok()?;
    let nanos = value.checked_mul(1_000_000_000 / units_per_second)?;
    let secs = i64::try_from(nanos.div_euclid(1_000_000_000)).ok()?;
    let subsec = u32::try_from(nanos.rem_euclid(1_000_000_000)).ok()?;
    DateTime::from_timestamp(secs, subsec)
}
