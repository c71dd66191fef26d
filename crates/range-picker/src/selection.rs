//! The range-selection state machine.
//!
//! [`RangeSelection`] holds the candidate `(start, end)` pair for one picker
//! invocation and reconciles the three ways of producing it: two-click
//! calendar selection, preset activation, and manual date/hour edits.
//!
//! Whenever both bounds are set, `start <= end`; any operation that would
//! invert the range swaps the bounds instead.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Weekday};
use tracing::debug;

use crate::config::PickerConfig;
use crate::error::{PickerError, Result};
use crate::filter::{HourPreset, WeekdayGroup, WeekdaySet};
use crate::offset::{self, localize, Edge, OffsetExpr};
use crate::preset::{self, TimeRange};
use crate::value::{HourWindow, PickerResult, PickerValue};

/// Which end of the range the next calendar click sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickingPhase {
    #[default]
    AwaitingStart,
    AwaitingEnd,
}

/// One side of the candidate range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Start,
    End,
}

/// Mutable picker state for a single invocation.
#[derive(Debug, Clone)]
pub struct RangeSelection<Tz: TimeZone> {
    config: PickerConfig,
    presets: Vec<TimeRange>,
    tz: Tz,
    start: Option<DateTime<Tz>>,
    end: Option<DateTime<Tz>>,
    active_preset: Option<TimeRange>,
    phase: PickingPhase,
    day_subset_enabled: bool,
    weekdays: WeekdaySet,
    weekday_group: WeekdayGroup,
    hour_subset_enabled: bool,
    hour_preset: HourPreset,
}

impl<Tz: TimeZone> RangeSelection<Tz> {
    /// An empty selection in `tz`: no range, no preset, all weekdays, no filters.
    pub fn new(config: PickerConfig, tz: Tz) -> Self {
        let presets = preset::catalog(config.allow_future_dates);
        Self {
            config,
            presets,
            tz,
            start: None,
            end: None,
            active_preset: None,
            phase: PickingPhase::AwaitingStart,
            day_subset_enabled: false,
            weekdays: WeekdaySet::all(),
            weekday_group: WeekdayGroup::All,
            hour_subset_enabled: false,
            hour_preset: HourPreset::Custom,
        }
    }

    /// Start a picking session in the time zone of `now`.
    ///
    /// A prior value seeds the range and filters. Without one, the configured
    /// default preset (if any) is activated.
    pub fn open(config: PickerConfig, prior: Option<&PickerValue>, now: &DateTime<Tz>) -> Self {
        let mut selection = Self::new(config, now.timezone());
        match prior {
            Some(value) => selection.seed(value, now),
            None => {
                let default = selection
                    .config
                    .default_preset
                    .as_deref()
                    .and_then(|label| preset::find_preset(&selection.presets, label))
                    .cloned();
                if let Some(default) = default {
                    selection.select_preset(&default, now);
                }
            }
        }
        selection
    }

    fn seed(&mut self, prior: &PickerValue, now: &DateTime<Tz>) {
        let encoding = self.config.prior_encoding;
        let start = prior.start.to_datetime(&self.tz, encoding);
        let end = prior.end.to_datetime(&self.tz, encoding);

        match (start, end) {
            (Some(start), Some(end)) => {
                self.start = Some(start);
                self.end = Some(end);
                self.normalize();
                if let (Some(start), Some(end)) = (&self.start, &self.end) {
                    let now = now.with_timezone(&self.tz);
                    self.active_preset =
                        preset::match_relative_preset(&self.presets, start, end, &now).cloned();
                }
            }
            (Some(start), None) => {
                self.start = Some(start);
                self.phase = PickingPhase::AwaitingEnd;
            }
            (None, Some(end)) => self.end = Some(end),
            (None, None) => debug!("prior value has no usable range"),
        }

        if let Some(names) = prior.week_days.as_deref().filter(|names| !names.is_empty()) {
            self.day_subset_enabled = true;
            self.weekdays = WeekdaySet::from_names_lossy(names);
            self.weekday_group = WeekdayGroup::classify(self.weekdays, self.config.working_days);
        }

        if let (Some(start_hour), Some(end_hour)) = (prior.start_hour, prior.end_hour) {
            let start_minute = prior.start_minute.unwrap_or(0);
            let end_minute = prior.end_minute.unwrap_or(59);
            self.hour_subset_enabled = true;
            self.hour_preset = HourPreset::detect(start_hour, start_minute, end_hour, end_minute);

            let start_time = NaiveTime::from_hms_opt(start_hour, start_minute, 0);
            let end_time = NaiveTime::from_hms_opt(end_hour, end_minute, 0);
            if let (Some(start_time), Some(end_time)) = (start_time, end_time) {
                if self.start.is_some() && self.end.is_some() {
                    self.set_times(start_time, end_time);
                    self.active_preset = None;
                }
            }
        }
    }

    // ── Calendar interaction ────────────────────────────────────────────

    /// Handle a click on a calendar day.
    ///
    /// The first click starts a new range at the beginning of `day`. The second
    /// click completes it: the range runs from the start of the earlier day to
    /// the end of the later one.
    pub fn on_calendar_day_click(&mut self, day: NaiveDate) {
        let anchor = match (self.phase, &self.start) {
            (PickingPhase::AwaitingEnd, Some(start)) => start.date_naive(),
            _ => {
                self.begin_pick(day);
                return;
            }
        };

        let (first, last) = if day < anchor { (day, anchor) } else { (anchor, day) };
        let (Some(start), Some(end)) = (
            self.at(first.and_time(Edge::Start.time_of_day())),
            self.at(last.and_time(Edge::End.time_of_day())),
        ) else {
            debug!(%first, %last, "calendar range not representable, click ignored");
            return;
        };

        debug!(%first, %last, "calendar range committed");
        self.start = Some(start);
        self.end = Some(end);
        self.active_preset = None;
        self.hour_preset = HourPreset::Custom;
        self.phase = PickingPhase::AwaitingStart;
    }

    fn begin_pick(&mut self, day: NaiveDate) {
        let Some(start) = self.at(day.and_time(Edge::Start.time_of_day())) else {
            debug!(%day, "calendar day not representable, click ignored");
            return;
        };

        debug!(%day, "calendar range started");
        self.start = Some(start);
        self.end = None;
        self.active_preset = None;
        self.phase = PickingPhase::AwaitingEnd;
    }

    // ── Presets ─────────────────────────────────────────────────────────

    /// Activate `preset`, or deactivate it if it is already active.
    ///
    /// Either way the hour filter returns to its default (disabled, custom),
    /// since a preset describes whole-range granularity.
    pub fn select_preset(&mut self, preset: &TimeRange, now: &DateTime<Tz>) {
        if self.active_preset.as_ref() == Some(preset) {
            debug!(label = %preset.label, "preset deactivated");
            self.active_preset = None;
            self.start = None;
            self.end = None;
        } else {
            let range = preset::select_time_range(preset, now, &self.config.resolve_options());
            debug!(label = %preset.label, "preset activated");
            self.start = Some(range.start.with_timezone(&self.tz));
            self.end = Some(range.end.with_timezone(&self.tz));
            self.active_preset = Some(preset.clone());
            self.normalize();
        }

        self.hour_subset_enabled = false;
        self.hour_preset = HourPreset::Custom;
    }

    // ── Manual edits ────────────────────────────────────────────────────

    /// Replace the calendar date of one side from user text.
    ///
    /// Accepts `YYYY-MM-DD` or any literal date-time. On failure the state is
    /// left untouched.
    pub fn edit_date_part(&mut self, side: Side, input: &str) -> Result<()> {
        let date = self.parse_date_input(input).ok_or_else(|| {
            PickerError::InvalidDatetime(format!("cannot parse date: '{}'", input.trim()))
        })?;
        self.set_date_part(side, date)
    }

    /// Replace the calendar date of one side, keeping its time of day
    /// (midnight if the side was empty).
    pub fn set_date_part(&mut self, side: Side, date: NaiveDate) -> Result<()> {
        let time = self
            .bound(side)
            .map(|current| current.naive_local().time())
            .unwrap_or(NaiveTime::MIN);
        let updated = self.at(date.and_time(time)).ok_or_else(|| {
            PickerError::InvalidDatetime(format!("{date} {time} does not exist in this time zone"))
        })?;

        *self.bound_mut(side) = Some(updated);
        self.active_preset = None;
        self.normalize();
        Ok(())
    }

    /// Set the hour and minute of one side, keeping its date.
    pub fn edit_hour_field(&mut self, side: Side, hour: u32, minute: u32) -> Result<()> {
        let time = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or_else(|| PickerError::InvalidTime(format!("{hour:02}:{minute:02}")))?;
        let current = self
            .bound(side)
            .ok_or_else(|| PickerError::MissingBound(format!("{side:?} is not set")))?;
        let updated = self.at(current.date_naive().and_time(time)).ok_or_else(|| {
            PickerError::InvalidTime(format!("{hour:02}:{minute:02} does not exist on that date"))
        })?;

        *self.bound_mut(side) = Some(updated);
        self.active_preset = None;
        self.hour_preset = HourPreset::Custom;
        self.normalize();
        Ok(())
    }

    /// Apply an hour-of-day shortcut.
    ///
    /// `AllDay` and `BusyHours` rewrite the times of both bounds (when both are
    /// set) and drop the active preset. `AllDay` turns the hour filter off;
    /// the others turn it on.
    pub fn apply_hour_preset(&mut self, kind: HourPreset) {
        self.hour_preset = kind;
        self.hour_subset_enabled = kind != HourPreset::AllDay;

        let Some((start_time, end_time)) = kind.window() else {
            return;
        };
        self.active_preset = None;
        if self.start.is_some() && self.end.is_some() {
            self.set_times(start_time, end_time);
        }
    }

    pub fn set_hour_subset_enabled(&mut self, enabled: bool) {
        self.hour_subset_enabled = enabled;
    }

    pub fn set_day_subset_enabled(&mut self, enabled: bool) {
        self.day_subset_enabled = enabled;
    }

    // ── Weekday filter ──────────────────────────────────────────────────

    /// Flip one weekday and recompute which group the selection matches.
    pub fn toggle_weekday(&mut self, day: Weekday) {
        self.weekdays.toggle(day);
        self.weekday_group = WeekdayGroup::classify(self.weekdays, self.config.working_days);
    }

    /// Replace the weekday selection with a named group.
    pub fn set_weekday_group(&mut self, group: WeekdayGroup) {
        self.weekdays = group.members(self.config.working_days);
        self.weekday_group = group;
    }

    // ── Outcome ─────────────────────────────────────────────────────────

    /// Produce the committed value, or reject an incomplete range.
    ///
    /// Filters are included only when optional features are enabled, and
    /// each only when its subset flag is on. With the hour filter on, both
    /// instants are truncated to whole minutes.
    pub fn submit(&self) -> Result<PickerResult<Tz>> {
        let (Some(start), Some(end)) = (self.start.clone(), self.end.clone()) else {
            return Err(PickerError::IncompleteRange(format!(
                "start {}, end {}",
                if self.start.is_some() { "set" } else { "missing" },
                if self.end.is_some() { "set" } else { "missing" },
            )));
        };

        let mut result = PickerResult {
            start,
            end,
            week_days: None,
            hours: None,
        };

        if self.config.optional_features_enabled {
            if self.day_subset_enabled {
                result.week_days = Some(self.weekdays);
            }
            if self.hour_subset_enabled {
                result.start = self.truncate_to_minute(result.start);
                result.end = self.truncate_to_minute(result.end);
                result.hours = Some(HourWindow {
                    start_hour: result.start.hour(),
                    start_minute: result.start.minute(),
                    end_hour: result.end.hour(),
                    end_minute: result.end.minute(),
                });
            }
        }

        debug!(
            week_days = result.week_days.is_some(),
            hours = result.hours.is_some(),
            "range submitted"
        );
        Ok(result)
    }

    /// Close without a result.
    pub fn dismiss(self) {
        debug!("picker dismissed");
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn config(&self) -> &PickerConfig {
        &self.config
    }

    /// Presets offered in this session.
    pub fn presets(&self) -> &[TimeRange] {
        &self.presets
    }

    pub fn candidate_start(&self) -> Option<&DateTime<Tz>> {
        self.start.as_ref()
    }

    pub fn candidate_end(&self) -> Option<&DateTime<Tz>> {
        self.end.as_ref()
    }

    pub fn phase(&self) -> PickingPhase {
        self.phase
    }

    pub fn active_preset(&self) -> Option<&TimeRange> {
        self.active_preset.as_ref()
    }

    pub fn is_day_subset_enabled(&self) -> bool {
        self.day_subset_enabled
    }

    pub fn weekdays(&self) -> WeekdaySet {
        self.weekdays
    }

    pub fn weekday_group(&self) -> WeekdayGroup {
        self.weekday_group
    }

    pub fn is_hour_subset_enabled(&self) -> bool {
        self.hour_subset_enabled
    }

    pub fn hour_preset(&self) -> HourPreset {
        self.hour_preset
    }

    /// `(hour, minute)` of one side, `None` while that side is unset.
    pub fn hour_field(&self, side: Side) -> Option<(u32, u32)> {
        self.bound(side).map(|dt| (dt.hour(), dt.minute()))
    }

    // ── Internal helpers ────────────────────────────────────────────────

    fn bound(&self, side: Side) -> Option<&DateTime<Tz>> {
        match side {
            Side::Start => self.start.as_ref(),
            Side::End => self.end.as_ref(),
        }
    }

    fn bound_mut(&mut self, side: Side) -> &mut Option<DateTime<Tz>> {
        match side {
            Side::Start => &mut self.start,
            Side::End => &mut self.end,
        }
    }

    fn at(&self, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
        localize(&self.tz, naive)
    }

    /// Swap the bounds if they are inverted.
    fn normalize(&mut self) {
        if let (Some(start), Some(end)) = (&self.start, &self.end) {
            if start > end {
                debug!("inverted range, swapping bounds");
                std::mem::swap(&mut self.start, &mut self.end);
            }
        }
    }

    /// Rewrite the time of day of both bounds, keeping their dates.
    fn set_times(&mut self, start_time: NaiveTime, end_time: NaiveTime) {
        let start = self
            .start
            .as_ref()
            .and_then(|start| self.at(start.date_naive().and_time(start_time)));
        let end = self
            .end
            .as_ref()
            .and_then(|end| self.at(end.date_naive().and_time(end_time)));
        if let (Some(start), Some(end)) = (start, end) {
            self.start = Some(start);
            self.end = Some(end);
            self.normalize();
        }
    }

    fn truncate_to_minute(&self, dt: DateTime<Tz>) -> DateTime<Tz> {
        dt.naive_local()
            .with_second(0)
            .and_then(|naive| naive.with_nanosecond(0))
            .and_then(|naive| self.at(naive))
            .unwrap_or(dt)
    }

    fn parse_date_input(&self, input: &str) -> Option<NaiveDate> {
        let trimmed = input.trim();
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Some(date);
        }
        match offset::parse(trimmed)? {
            OffsetExpr::Literal(dt) => Some(dt.with_timezone(&self.tz).date_naive()),
            OffsetExpr::LocalLiteral(naive) => Some(naive.date()),
            _ => None,
        }
    }
}
