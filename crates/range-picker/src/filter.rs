//! Secondary filters layered on top of the date range: a weekday subset and
//! an hour-of-day window.

use std::fmt;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::offset::end_of_day_time;

/// Row order of the weekday toggles, also used for serialized `week_days`.
pub const WEEKDAY_ORDER: [Weekday; 7] = [
    Weekday::Sat,
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

/// Full English name used on the wire (`"Saturday"`).
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Parse a weekday name (case-insensitive, supports full and abbreviated).
pub fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.trim().to_ascii_lowercase().as_str() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

// ── Weekday set ─────────────────────────────────────────────────────────────

/// A set of weekdays stored as a 7-bit mask (bit 0 = Monday).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    const ALL_BITS: u8 = 0b111_1111;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn all() -> Self {
        Self(Self::ALL_BITS)
    }

    fn bit(day: Weekday) -> u8 {
        1 << day.num_days_from_monday()
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & Self::bit(day) != 0
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= Self::bit(day);
    }

    pub fn remove(&mut self, day: Weekday) {
        self.0 &= !Self::bit(day);
    }

    /// Flip membership of `day`; returns whether it is now selected.
    pub fn toggle(&mut self, day: Weekday) -> bool {
        self.0 ^= Self::bit(day);
        self.contains(day)
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_all(self) -> bool {
        self.0 == Self::ALL_BITS
    }

    /// Members in [`WEEKDAY_ORDER`].
    pub fn iter(self) -> impl Iterator<Item = Weekday> {
        WEEKDAY_ORDER.into_iter().filter(move |day| self.contains(*day))
    }

    /// Full English names in [`WEEKDAY_ORDER`].
    pub fn names(self) -> Vec<String> {
        self.iter().map(|day| weekday_name(day).to_string()).collect()
    }

    /// Build a set from names, skipping anything unrecognized.
    pub fn from_names_lossy<S: AsRef<str>>(names: &[S]) -> Self {
        names
            .iter()
            .filter_map(|name| parse_weekday(name.as_ref()))
            .collect()
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = Self::empty();
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl fmt::Debug for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Serde adapter: a [`WeekdaySet`] as a list of weekday names. Unknown names
/// are an error.
pub mod weekday_names {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{parse_weekday, WeekdaySet};

    pub fn serialize<S: Serializer>(set: &WeekdaySet, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(set.names())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<WeekdaySet, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        names
            .iter()
            .map(|name| {
                parse_weekday(name).ok_or_else(|| D::Error::custom(format!("unknown weekday '{name}'")))
            })
            .collect()
    }
}

// ── Weekday groups ──────────────────────────────────────────────────────────

/// Named weekday selections shown above the weekday toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekdayGroup {
    #[default]
    All,
    WorkingDays,
    Custom,
}

impl WeekdayGroup {
    /// The selection this group stands for. `Custom` clears the selection.
    pub fn members(self, working_days: WeekdaySet) -> WeekdaySet {
        match self {
            WeekdayGroup::All => WeekdaySet::all(),
            WeekdayGroup::WorkingDays => working_days,
            WeekdayGroup::Custom => WeekdaySet::empty(),
        }
    }

    /// The group whose members are exactly `selected`, or `Custom`.
    pub fn classify(selected: WeekdaySet, working_days: WeekdaySet) -> Self {
        if selected.is_all() {
            WeekdayGroup::All
        } else if !selected.is_empty() && selected == working_days {
            WeekdayGroup::WorkingDays
        } else {
            WeekdayGroup::Custom
        }
    }
}

// ── Hour presets ────────────────────────────────────────────────────────────

/// Hour-of-day window shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HourPreset {
    /// 00:00 through 23:59:59.999.
    AllDay,
    /// 20:00 through 23:59:59.999.
    BusyHours,
    /// Leave the explicit hour fields alone.
    #[default]
    Custom,
}

impl HourPreset {
    /// The forced `(start, end)` times of day, `None` for `Custom`.
    pub fn window(self) -> Option<(NaiveTime, NaiveTime)> {
        match self {
            HourPreset::AllDay => Some((NaiveTime::MIN, end_of_day_time())),
            HourPreset::BusyHours => {
                NaiveTime::from_hms_opt(20, 0, 0).map(|start| (start, end_of_day_time()))
            }
            HourPreset::Custom => None,
        }
    }

    /// Recognize a preset from explicit hour/minute fields.
    pub fn detect(start_hour: u32, start_minute: u32, end_hour: u32, end_minute: u32) -> Self {
        match (start_hour, start_minute, end_hour, end_minute) {
            (0, 0, 23, 59) => HourPreset::AllDay,
            (20, 0, 23, 59) => HourPreset::BusyHours,
            _ => HourPreset::Custom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn working() -> WeekdaySet {
        WeekdaySet::from_iter([
            Weekday::Sat,
            Weekday::Sun,
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
        ])
    }

    #[test]
    fn test_set_insert_remove_toggle() {
        let mut set = WeekdaySet::empty();
        set.insert(Weekday::Mon);
        set.insert(Weekday::Mon);
        assert_eq!(set.len(), 1);
        assert!(set.toggle(Weekday::Fri));
        assert!(!set.toggle(Weekday::Mon));
        set.remove(Weekday::Fri);
        assert!(set.is_empty());
    }

    #[test]
    fn test_set_iterates_in_row_order() {
        let set = WeekdaySet::from_iter([Weekday::Fri, Weekday::Mon, Weekday::Sat]);
        assert_eq!(set.names(), vec!["Saturday", "Monday", "Friday"]);
    }

    #[test]
    fn test_from_names_lossy_skips_unknown() {
        let set = WeekdaySet::from_names_lossy(&["saturday", "SUN", "someday", "Wed"]);
        assert_eq!(set.names(), vec!["Saturday", "Sunday", "Wednesday"]);
    }

    #[test]
    fn test_classify_groups() {
        assert_eq!(WeekdayGroup::classify(WeekdaySet::all(), working()), WeekdayGroup::All);
        assert_eq!(WeekdayGroup::classify(working(), working()), WeekdayGroup::WorkingDays);
        let mut extra = working();
        extra.insert(Weekday::Thu);
        assert_eq!(WeekdayGroup::classify(extra, working()), WeekdayGroup::Custom);
        assert_eq!(
            WeekdayGroup::classify(WeekdaySet::empty(), working()),
            WeekdayGroup::Custom
        );
    }

    #[test]
    fn test_group_members() {
        assert!(WeekdayGroup::All.members(working()).is_all());
        assert_eq!(WeekdayGroup::WorkingDays.members(working()), working());
        assert!(WeekdayGroup::Custom.members(working()).is_empty());
    }

    #[test]
    fn test_hour_preset_windows() {
        let (start, end) = HourPreset::AllDay.window().unwrap();
        assert_eq!(start, NaiveTime::MIN);
        assert_eq!((end.hour(), end.minute(), end.second()), (23, 59, 59));

        let (start, _) = HourPreset::BusyHours.window().unwrap();
        assert_eq!(start.hour(), 20);

        assert!(HourPreset::Custom.window().is_none());
    }

    #[test]
    fn test_hour_preset_detect() {
        assert_eq!(HourPreset::detect(0, 0, 23, 59), HourPreset::AllDay);
        assert_eq!(HourPreset::detect(20, 0, 23, 59), HourPreset::BusyHours);
        assert_eq!(HourPreset::detect(9, 0, 17, 0), HourPreset::Custom);
    }

    #[test]
    fn test_weekday_names_serde() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            #[serde(with = "weekday_names")]
            days: WeekdaySet,
        }

        let json = serde_json::to_string(&Wrapper { days: working() }).unwrap();
        assert_eq!(
            json,
            r#"{"days":["Saturday","Sunday","Monday","Tuesday","Wednesday"]}"#
        );
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.days, working());
    }
}
