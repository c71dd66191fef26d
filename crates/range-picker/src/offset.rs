//! Relative time-offset resolution.
//!
//! Converts the small offset expression language used by presets into
//! concrete instants relative to a caller-supplied "now". Every function is
//! pure: the caller provides the anchor, so resolution is deterministic and
//! the same catalog entry resolves against fresh time on every activation.
//!
//! # Grammar
//!
//! ```text
//! expr    := "offset:" body | "startof:" period | literal
//! body    := point [ "/" suffix ]
//! point   := "now" | "today" | "thisweek" | "thismonth" | "thisyear"
//!          | [ "+" | "-" ] digits unit
//! unit    := minute | hour | day | week | month | year   (optionally plural)
//! suffix  := "start" | "end" | "day" | "week" | "month" | "year"
//! period  := "week" | "month" | "year"
//! literal := RFC 3339 date-time | "YYYY-MM-DDTHH:MM[:SS]" | "YYYY-MM-DD"
//! ```
//!
//! Matching is case-insensitive. All calendar arithmetic happens on the
//! wall clock of the anchor's time zone.
//!
//! # Permissive Resolution
//!
//! [`resolve`] never fails. An expression that does not match the grammar
//! resolves to `now` and emits a `debug` event. Callers that need to reject
//! bad input should parse with [`OffsetExpr::from_str`] first.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, LocalResult, Months, NaiveDate, NaiveDateTime,
    NaiveTime, Offset, TimeZone, Weekday,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PickerError;

// ── Configurable week start ─────────────────────────────────────────────────

/// Which day begins a week for `thisweek`, `startof:week` and `/week` spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStartDay {
    /// ISO 8601 standard (Monday = day 0 of the week).
    #[default]
    Monday,
    /// US/Canada convention (Sunday = day 0 of the week).
    Sunday,
}

/// Options for [`resolve_with_options`] and [`resolve_bound_with_options`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Which day starts the week for period computations.
    pub week_start: WeekStartDay,
}

/// How many days `weekday` is from the week-start day.
fn days_from_week_start(weekday: Weekday, week_start: WeekStartDay) -> i64 {
    match week_start {
        WeekStartDay::Monday => weekday.num_days_from_monday() as i64,
        WeekStartDay::Sunday => weekday.num_days_from_sunday() as i64,
    }
}

// ── Expression model ────────────────────────────────────────────────────────

/// Unit of a relative shift such as `-7days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl OffsetUnit {
    fn parse(s: &str) -> Option<Self> {
        let singular = s.strip_suffix('s').unwrap_or(s);
        match singular {
            "minute" => Some(Self::Minute),
            "hour" => Some(Self::Hour),
            "day" => Some(Self::Day),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "year" => Some(Self::Year),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Minute => "minutes",
            Self::Hour => "hours",
            Self::Day => "days",
            Self::Week => "weeks",
            Self::Month => "months",
            Self::Year => "years",
        }
    }
}

/// A calendar period used for boundaries and spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

impl Period {
    fn parse(s: &str) -> Option<Self> {
        match s.strip_suffix('s').unwrap_or(s) {
            "day" => Some(Self::Day),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "year" => Some(Self::Year),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

/// Named anchors that resolve to the start of the current period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedPoint {
    Today,
    ThisWeek,
    ThisMonth,
    ThisYear,
}

impl NamedPoint {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "today" => Some(Self::Today),
            "thisweek" => Some(Self::ThisWeek),
            "thismonth" => Some(Self::ThisMonth),
            "thisyear" => Some(Self::ThisYear),
            _ => None,
        }
    }

    fn period(self) -> Period {
        match self {
            Self::Today => Period::Day,
            Self::ThisWeek => Period::Week,
            Self::ThisMonth => Period::Month,
            Self::ThisYear => Period::Year,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::ThisWeek => "thisweek",
            Self::ThisMonth => "thismonth",
            Self::ThisYear => "thisyear",
        }
    }
}

/// Which end of a day or period an instant is snapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Edge {
    /// First instant, `00:00:00.000`.
    #[default]
    Start,
    /// Last instant, `23:59:59.999`.
    End,
}

impl Edge {
    /// Wall-clock time of day for this edge.
    pub fn time_of_day(self) -> NaiveTime {
        match self {
            Edge::Start => NaiveTime::MIN,
            Edge::End => end_of_day_time(),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Edge::Start => "start",
            Edge::End => "end",
        }
    }
}

/// 23:59:59.999, the last millisecond of a calendar day.
pub fn end_of_day_time() -> NaiveTime {
    let (time, _) = NaiveTime::MIN.overflowing_sub_signed(Duration::milliseconds(1));
    time
}

/// A parsed offset expression.
#[derive(Debug, Clone, PartialEq)]
pub enum OffsetExpr {
    /// `offset:now`
    Now,
    /// `offset:-7days`, `offset:+1months`; `amount` carries the sign.
    Shift { amount: i64, unit: OffsetUnit },
    /// `offset:today`, `offset:thisweek`, ...
    Named(NamedPoint),
    /// `startof:week`, `startof:month`, `startof:year`
    StartOf(Period),
    /// `<base>/start` or `<base>/end`: same date, time clamped to the day edge.
    Clamp { base: Box<OffsetExpr>, edge: Edge },
    /// `<base>/week` etc.: snapped to the edge of the containing period.
    /// The edge comes from the side of the range being resolved.
    Span { base: Box<OffsetExpr>, period: Period },
    /// An absolute instant with an explicit offset.
    Literal(DateTime<FixedOffset>),
    /// A wall-clock date-time, interpreted in the anchor's time zone.
    LocalLiteral(NaiveDateTime),
}

impl OffsetExpr {
    /// Resolve against `now` as a start bound.
    pub fn resolve<Tz: TimeZone>(&self, now: &DateTime<Tz>, options: &ResolveOptions) -> DateTime<Tz> {
        self.resolve_bound(now, Edge::Start, options)
    }

    /// Resolve against `now`; `bound` picks the edge used by period spans.
    pub fn resolve_bound<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
        bound: Edge,
        options: &ResolveOptions,
    ) -> DateTime<Tz> {
        match self {
            OffsetExpr::Now => now.clone(),
            OffsetExpr::Shift { amount, unit } => {
                shift(now, *amount, *unit).unwrap_or_else(|| {
                    debug!(amount, unit = unit.as_str(), "offset shift out of range, using now");
                    now.clone()
                })
            }
            OffsetExpr::Named(point) => period_edge(now, point.period(), Edge::Start, options),
            OffsetExpr::StartOf(period) => period_edge(now, *period, Edge::Start, options),
            OffsetExpr::Clamp { base, edge } => {
                let resolved = base.resolve_bound(now, *edge, options);
                day_edge(&resolved, *edge)
            }
            OffsetExpr::Span { base, period } => {
                let resolved = base.resolve_bound(now, bound, options);
                period_edge(&resolved, *period, bound, options)
            }
            OffsetExpr::Literal(dt) => dt.with_timezone(&now.timezone()),
            OffsetExpr::LocalLiteral(naive) => {
                localize(&now.timezone(), *naive).unwrap_or_else(|| now.clone())
            }
        }
    }

    fn fmt_point(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OffsetExpr::Now => write!(f, "offset:now"),
            OffsetExpr::Shift { amount, unit } => write!(f, "offset:{amount:+}{}", unit.as_str()),
            OffsetExpr::Named(point) => write!(f, "offset:{}", point.as_str()),
            OffsetExpr::StartOf(period) => write!(f, "startof:{}", period.as_str()),
            OffsetExpr::Literal(dt) => write!(f, "{}", dt.to_rfc3339()),
            OffsetExpr::LocalLiteral(naive) => write!(f, "{}", naive.format("%Y-%m-%dT%H:%M:%S%.f")),
            OffsetExpr::Clamp { base, edge } => {
                base.fmt_point(f)?;
                write!(f, "/{}", edge.as_str())
            }
            OffsetExpr::Span { base, period } => {
                base.fmt_point(f)?;
                write!(f, "/{}", period.as_str())
            }
        }
    }
}

impl fmt::Display for OffsetExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_point(f)
    }
}

impl FromStr for OffsetExpr {
    type Err = PickerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s).ok_or_else(|| {
            PickerError::InvalidExpression(format!("cannot parse offset expression: '{}'", s.trim()))
        })
    }
}

// ── Parsing ─────────────────────────────────────────────────────────────────

/// Parse an offset expression. Returns `None` for anything outside the grammar.
pub fn parse(expr: &str) -> Option<OffsetExpr> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lower = trimmed.to_ascii_lowercase();
    if let Some(body) = lower.strip_prefix("offset:") {
        return try_offset_body(body.trim());
    }
    if let Some(period) = lower.strip_prefix("startof:") {
        return try_start_of(period.trim());
    }

    try_literal(trimmed)
}

/// `<point>[/<suffix>]`
fn try_offset_body(body: &str) -> Option<OffsetExpr> {
    let (point, suffix) = match body.split_once('/') {
        Some((point, suffix)) => (point.trim(), Some(suffix.trim())),
        None => (body, None),
    };

    let base = try_point(point)?;
    let Some(suffix) = suffix else {
        return Some(base);
    };

    let base = Box::new(base);
    match suffix {
        "start" => Some(OffsetExpr::Clamp { base, edge: Edge::Start }),
        "end" => Some(OffsetExpr::Clamp { base, edge: Edge::End }),
        other => Period::parse(other).map(|period| OffsetExpr::Span { base, period }),
    }
}

fn try_point(s: &str) -> Option<OffsetExpr> {
    if s == "now" {
        return Some(OffsetExpr::Now);
    }
    if let Some(point) = NamedPoint::parse(s) {
        return Some(OffsetExpr::Named(point));
    }
    try_shift(s)
}

/// `[+|-]<digits><unit>`, sign defaults to `+`.
fn try_shift(s: &str) -> Option<OffsetExpr> {
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'+') => (false, &s[1..]),
        Some(b'-') => (true, &s[1..]),
        _ => (false, s),
    };

    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }

    let quantity: i64 = rest[..digits_end].parse().ok()?;
    let unit = OffsetUnit::parse(&rest[digits_end..])?;
    let amount = if negative { -quantity } else { quantity };

    Some(OffsetExpr::Shift { amount, unit })
}

fn try_start_of(s: &str) -> Option<OffsetExpr> {
    match Period::parse(s)? {
        Period::Day => None,
        period => Some(OffsetExpr::StartOf(period)),
    }
}

const LOCAL_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Bare ISO 8601 date-time or date, no offset semantics.
fn try_literal(s: &str) -> Option<OffsetExpr> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(OffsetExpr::Literal(dt));
    }
    for format in LOCAL_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(OffsetExpr::LocalLiteral(naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|date| OffsetExpr::LocalLiteral(date.and_time(NaiveTime::MIN)))
}

// ── Resolution ──────────────────────────────────────────────────────────────

/// Resolve an offset expression against `now` (Monday week start).
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use range_picker::offset::resolve;
///
/// let now = Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap();
/// let start = resolve("offset:-1days/start", &now);
/// assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 14, 0, 0, 0).unwrap());
/// ```
pub fn resolve<Tz: TimeZone>(expr: &str, now: &DateTime<Tz>) -> DateTime<Tz> {
    resolve_bound_with_options(expr, now, Edge::Start, &ResolveOptions::default())
}

/// Resolve an offset expression against `now` with options.
pub fn resolve_with_options<Tz: TimeZone>(
    expr: &str,
    now: &DateTime<Tz>,
    options: &ResolveOptions,
) -> DateTime<Tz> {
    resolve_bound_with_options(expr, now, Edge::Start, options)
}

/// Resolve an offset expression as the given side of a range.
///
/// The side only matters for period spans (`offset:-1weeks/week`), which snap
/// to the first instant of the period for a start bound and the last instant
/// for an end bound.
pub fn resolve_bound<Tz: TimeZone>(expr: &str, now: &DateTime<Tz>, bound: Edge) -> DateTime<Tz> {
    resolve_bound_with_options(expr, now, bound, &ResolveOptions::default())
}

/// Resolve an offset expression as the given side of a range, with options.
pub fn resolve_bound_with_options<Tz: TimeZone>(
    expr: &str,
    now: &DateTime<Tz>,
    bound: Edge,
    options: &ResolveOptions,
) -> DateTime<Tz> {
    match parse(expr) {
        Some(parsed) => parsed.resolve_bound(now, bound, options),
        None => {
            debug!(expression = expr, "unrecognized offset expression, using now");
            now.clone()
        }
    }
}

// ── Internal helpers ────────────────────────────────────────────────────────

/// Shift `now` by a signed quantity. Minutes and hours are absolute; days and
/// weeks move the wall-clock date; months and years use calendar months,
/// clamping the day to the end of a shorter month.
fn shift<Tz: TimeZone>(now: &DateTime<Tz>, amount: i64, unit: OffsetUnit) -> Option<DateTime<Tz>> {
    match unit {
        OffsetUnit::Minute => now.clone().checked_add_signed(Duration::try_minutes(amount)?),
        OffsetUnit::Hour => now.clone().checked_add_signed(Duration::try_hours(amount)?),
        OffsetUnit::Day => shift_days(now, amount),
        OffsetUnit::Week => shift_days(now, amount.checked_mul(7)?),
        OffsetUnit::Month => shift_months(now, amount),
        OffsetUnit::Year => shift_months(now, amount.checked_mul(12)?),
    }
}

fn shift_days<Tz: TimeZone>(now: &DateTime<Tz>, days: i64) -> Option<DateTime<Tz>> {
    let shifted = now
        .naive_local()
        .checked_add_signed(Duration::try_days(days)?)?;
    localize(&now.timezone(), shifted)
}

fn shift_months<Tz: TimeZone>(now: &DateTime<Tz>, months: i64) -> Option<DateTime<Tz>> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    let naive = now.naive_local();
    let shifted = if months >= 0 {
        naive.checked_add_months(magnitude)?
    } else {
        naive.checked_sub_months(magnitude)?
    };
    localize(&now.timezone(), shifted)
}

/// Keep the wall-clock date of `dt`, set the time to the edge of the day.
pub(crate) fn day_edge<Tz: TimeZone>(dt: &DateTime<Tz>, edge: Edge) -> DateTime<Tz> {
    let naive = dt.date_naive().and_time(edge.time_of_day());
    localize(&dt.timezone(), naive).unwrap_or_else(|| dt.clone())
}

/// Snap `dt` to the first or last instant of its containing period.
fn period_edge<Tz: TimeZone>(
    dt: &DateTime<Tz>,
    period: Period,
    edge: Edge,
    options: &ResolveOptions,
) -> DateTime<Tz> {
    let date = dt.date_naive();
    let first = match period {
        Period::Day => Some(date),
        Period::Week => {
            let back = days_from_week_start(date.weekday(), options.week_start);
            date.checked_sub_signed(Duration::days(back))
        }
        Period::Month => date.with_day(1),
        Period::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1),
    };

    let target = match edge {
        Edge::Start => first,
        Edge::End => first.and_then(|first| last_day_of(first, period)),
    };

    target
        .and_then(|day| localize(&dt.timezone(), day.and_time(edge.time_of_day())))
        .unwrap_or_else(|| dt.clone())
}

fn last_day_of(first: NaiveDate, period: Period) -> Option<NaiveDate> {
    match period {
        Period::Day => Some(first),
        Period::Week => first.checked_add_signed(Duration::days(6)),
        Period::Month => first.checked_add_months(Months::new(1))?.pred_opt(),
        Period::Year => NaiveDate::from_ymd_opt(first.year(), 12, 31),
    }
}

/// Map a wall-clock date-time to an instant in `tz`.
///
/// Ambiguous times (DST fall-back) take the earlier instant. Nonexistent
/// times (DST spring-forward gap) are read with the offset in effect before
/// the gap, which lands just after it.
pub(crate) fn localize<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => {
            let offset = offset_before_gap(tz, naive)?;
            let utc = naive.checked_sub_signed(Duration::seconds(offset.local_minus_utc() as i64))?;
            Some(tz.from_utc_datetime(&utc))
        }
    }
}

/// Offset of the last valid wall-clock time before `naive`, searched hourly
/// up to two days back.
fn offset_before_gap<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<FixedOffset> {
    (1..=48).find_map(|hours| {
        let earlier = naive.checked_sub_signed(Duration::hours(hours))?;
        tz.from_local_datetime(&earlier)
            .earliest()
            .map(|dt| dt.offset().fix())
    })
}

// ── Tests ───────────────────────────────────────────────────────────────────
