//! Preset time ranges and their resolution.
//!
//! A preset pairs a display label with two offset expressions. Expressions
//! are stored unresolved and resolved on activation, so "Last 7 days" always
//! means seven days before the moment it was clicked.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::offset::{self, Edge, OffsetExpr, OffsetUnit, ResolveOptions};

/// A labeled pair of offset expressions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// Display key; opaque to the core.
    pub label: String,
    /// Start expression. Empty means "same as end".
    pub start: String,
    /// End expression. Empty means "now".
    pub end: String,
}

impl TimeRange {
    pub fn new(label: impl Into<String>, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            start: start.into(),
            end: end.into(),
        }
    }
}

/// A preset resolved to concrete instants.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRange<Tz: TimeZone> {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

// ── Catalogs ────────────────────────────────────────────────────────────────

const RELATIVE: &[(&str, &str)] = &[
    ("Last 5 minutes", "-5minutes"),
    ("Last 15 minutes", "-15minutes"),
    ("Last 30 minutes", "-30minutes"),
    ("Last 1 hour", "-1hours"),
    ("Last 3 hours", "-3hours"),
    ("Last 6 hours", "-6hours"),
    ("Last 12 hours", "-12hours"),
    ("Last 24 hours", "-24hours"),
    ("Last 2 days", "-2days"),
    ("Last 7 days", "-7days"),
    ("Last 30 days", "-30days"),
    ("Last 90 days", "-90days"),
    ("Last 6 months", "-6months"),
    ("Last 1 year", "-1years"),
    ("Last 2 years", "-2years"),
    ("Last 5 years", "-5years"),
    ("Last month", "-1months"),
];

const FIXED: &[(&str, &str, &str)] = &[
    ("Yesterday", "offset:-1days/start", "offset:-1days/end"),
    ("Day before yesterday", "offset:-2days/start", "offset:-2days/end"),
    ("This day last week", "offset:-7days/start", "offset:-7days/end"),
    ("Previous week", "offset:-1weeks/week", "offset:-1weeks/week"),
    ("Previous month", "offset:-1months/month", "offset:-1months/month"),
    ("Previous year", "offset:-1years/year", "offset:-1years/year"),
    ("Today", "offset:0days/start", "offset:0days/end"),
    ("Today so far", "offset:0days/start", "offset:now"),
    ("This week so far", "startof:week", "offset:now"),
    ("This month so far", "startof:month", "offset:now"),
    ("This year so far", "startof:year", "offset:now"),
];

const FUTURE: &[(&str, &str)] = &[
    ("Next 1 day", "offset:+1days"),
    ("Next 1 week", "offset:+1weeks"),
    ("Next 1 month", "offset:+1months"),
    ("Next 3 months", "offset:+3months"),
];

/// Presets looking back from now, in display order.
pub fn standard_presets() -> Vec<TimeRange> {
    let relative = RELATIVE
        .iter()
        .map(|(label, offset)| TimeRange::new(*label, format!("offset:{offset}"), "offset:now"));
    let fixed = FIXED
        .iter()
        .map(|(label, start, end)| TimeRange::new(*label, *start, *end));
    relative.chain(fixed).collect()
}

/// Presets reaching into the future, offered only when future dates are allowed.
pub fn future_presets() -> Vec<TimeRange> {
    FUTURE
        .iter()
        .map(|(label, end)| TimeRange::new(*label, "offset:now", *end))
        .collect()
}

/// The catalog for one picker invocation.
pub fn catalog(allow_future_dates: bool) -> Vec<TimeRange> {
    let mut presets = standard_presets();
    if allow_future_dates {
        presets.extend(future_presets());
    }
    presets
}

/// Look a preset up by label.
pub fn find_preset<'a>(presets: &'a [TimeRange], label: &str) -> Option<&'a TimeRange> {
    presets.iter().find(|preset| preset.label == label)
}

// ── Resolution ──────────────────────────────────────────────────────────────

/// Resolve a preset against `now`.
///
/// The start expression resolves as a start bound and the end expression as
/// an end bound. An empty start collapses to the end (a point-in-time preset);
/// an empty end means `now`. An inverted result is swapped.
pub fn select_time_range<Tz: TimeZone>(
    preset: &TimeRange,
    now: &DateTime<Tz>,
    options: &ResolveOptions,
) -> ResolvedRange<Tz> {
    let end = if preset.end.trim().is_empty() {
        now.clone()
    } else {
        offset::resolve_bound_with_options(&preset.end, now, Edge::End, options)
    };
    let start = if preset.start.trim().is_empty() {
        end.clone()
    } else {
        offset::resolve_bound_with_options(&preset.start, now, Edge::Start, options)
    };

    if start <= end {
        ResolvedRange { start, end }
    } else {
        ResolvedRange { start: end, end: start }
    }
}

/// Find the `offset:-N<unit>` … `offset:now` preset that an existing range
/// corresponds to, if any.
///
/// The range must end within a minute of `now`. Its length is rounded to
/// whole minutes, hours, days, weeks, 30-day months and 365-day years, tried
/// in that order.
pub fn match_relative_preset<'a, Tz: TimeZone>(
    presets: &'a [TimeRange],
    start: &DateTime<Tz>,
    end: &DateTime<Tz>,
    now: &DateTime<Tz>,
) -> Option<&'a TimeRange> {
    if now.clone().signed_duration_since(end.clone()).num_seconds().abs() > 60 {
        return None;
    }

    let minutes = now.clone().signed_duration_since(start.clone()).num_seconds() as f64 / 60.0;
    if minutes <= 0.0 {
        return None;
    }
    let days = minutes / 1440.0;
    let candidates = [
        (minutes.round(), OffsetUnit::Minute),
        ((minutes / 60.0).round(), OffsetUnit::Hour),
        (days.round(), OffsetUnit::Day),
        ((days / 7.0).round(), OffsetUnit::Week),
        ((days / 30.0).round(), OffsetUnit::Month),
        ((days / 365.0).round(), OffsetUnit::Year),
    ];

    candidates
        .into_iter()
        .filter(|(quantity, _)| *quantity >= 1.0)
        .find_map(|(quantity, unit)| {
            let wanted = OffsetExpr::Shift {
                amount: -(quantity as i64),
                unit,
            };
            presets.iter().find(|preset| {
                offset::parse(&preset.start).as_ref() == Some(&wanted)
                    && offset::parse(&preset.end) == Some(OffsetExpr::Now)
            })
        })
}
