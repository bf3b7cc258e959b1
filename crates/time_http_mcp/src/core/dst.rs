//! Daylight-saving transition search.
//!
//! `chrono-tz` answers "what is the offset at instant T" but does not expose
//! the transition table, so transitions are located by sampling the DST
//! component of the offset once a day and bisecting each change down to the
//! second.
//!
//! Some zones (Europe/Dublin, Africa/Casablanca) encode their winter time as
//! a negative saving. Transitions are therefore classified by the change in
//! total offset: the higher offset is daylight-saving time and the saving is
//! always positive.

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::{OffsetComponents, Tz};

/// Sampling step while scanning for a transition
const SCAN_STEP_SECONDS: i64 = 86_400;
/// How far to look for a transition in either direction
const SCAN_WINDOW_DAYS: i64 = 366;

/// A change in the DST component of a zone's offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// First instant carrying the new offset
    pub at: DateTime<Utc>,
    /// DST saving (seconds) before the transition
    pub saving_before: i64,
    /// DST saving (seconds) from the transition on
    pub saving_after: i64,
    /// Total UTC offset (seconds) before the transition
    pub offset_before: i64,
    /// Total UTC offset (seconds) from the transition on
    pub offset_after: i64,
}

impl Transition {
    pub fn enters_dst(&self) -> bool {
        self.offset_after > self.offset_before
    }

    /// Change in total UTC offset, positive when clocks go forward
    pub fn offset_change(&self) -> i64 {
        self.offset_after - self.offset_before
    }
}

/// Active or upcoming saving period around a reference instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavingPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub saving_seconds: i64,
}

/// DST saving in seconds at `at`
pub fn saving_at(tz: &Tz, at: DateTime<Utc>) -> i64 {
    tz.offset_from_utc_datetime(&at.naive_utc())
        .dst_offset()
        .num_seconds()
}

/// Whether `at` falls in daylight-saving time, i.e. the higher of the
/// zone's alternating offsets
pub fn is_dst(tz: &Tz, at: DateTime<Utc>) -> bool {
    match saving_at(tz, at) {
        saving if saving > 0 => true,
        saving if saving < 0 => false,
        // Summer of a zone whose winter carries a negative saving
        _ => next_transition(tz, at)
            .map(|t| t.saving_after < 0)
            .or_else(|| previous_transition(tz, at).map(|t| t.saving_before < 0))
            .unwrap_or(false),
    }
}

/// Total UTC offset in seconds at `at`
pub fn offset_at(tz: &Tz, at: DateTime<Utc>) -> i64 {
    let offset = tz.offset_from_utc_datetime(&at.naive_utc());
    (offset.base_utc_offset() + offset.dst_offset()).num_seconds()
}

/// Next transition strictly after `from`, within the scan window
pub fn next_transition(tz: &Tz, from: DateTime<Utc>) -> Option<Transition> {
    let initial = saving_at(tz, from);
    let mut lo = from.timestamp();
    for _ in 0..SCAN_WINDOW_DAYS {
        let hi = lo + SCAN_STEP_SECONDS;
        if saving_at(tz, at_second(hi)?) != initial {
            return bisect(tz, lo, hi);
        }
        lo = hi;
    }
    None
}

/// Most recent transition at or before `from`, within the scan window
pub fn previous_transition(tz: &Tz, from: DateTime<Utc>) -> Option<Transition> {
    let current = saving_at(tz, from);
    let mut hi = from.timestamp();
    for _ in 0..SCAN_WINDOW_DAYS {
        let lo = hi - SCAN_STEP_SECONDS;
        if saving_at(tz, at_second(lo)?) != current {
            return bisect(tz, lo, hi);
        }
        hi = lo;
    }
    None
}

/// The saving period containing `at`, or the next one when `at` is in
/// standard time. `None` for zones that do not observe DST.
pub fn saving_period(tz: &Tz, at: DateTime<Utc>) -> Option<SavingPeriod> {
    if is_dst(tz, at) {
        let start = previous_transition(tz, at)?;
        let end = next_transition(tz, at)?;
        return Some(SavingPeriod {
            start: start.at,
            end: end.at,
            saving_seconds: -end.offset_change(),
        });
    }

    let start = next_transition(tz, at)?;
    let end = next_transition(tz, start.at)?;
    Some(SavingPeriod {
        start: start.at,
        end: end.at,
        saving_seconds: start.offset_change(),
    })
}

/// Narrow `(lo, hi]` (epoch seconds) down to the first second whose saving
/// differs from the one at `lo`
fn bisect(tz: &Tz, mut lo: i64, mut hi: i64) -> Option<Transition> {
    let before = at_second(lo)?;
    let saving_before = saving_at(tz, before);
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if saving_at(tz, at_second(mid)?) == saving_before {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let at = at_second(hi)?;
    Some(Transition {
        at,
        saving_before,
        saving_after: saving_at(tz, at),
        offset_before: offset_at(tz, before),
        offset_after: offset_at(tz, at),
    })
}

fn at_second(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}
