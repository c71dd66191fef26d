//! Picker configuration, fixed for the lifetime of one picking session.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::filter::{self, WeekdaySet};
use crate::offset::{ResolveOptions, WeekStartDay};
use crate::value::TimestampEncoding;

/// Feature flags and calendar conventions for a picker invocation.
///
/// Built once by the caller and handed to
/// [`RangeSelection::open`](crate::selection::RangeSelection::open); the
/// selection never re-reads flags from anywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerConfig {
    /// Append the future preset catalog ("Next 1 day", ...).
    pub allow_future_dates: bool,
    /// Emit weekday and hour-of-day filters on submit.
    pub optional_features_enabled: bool,
    /// First day of the week for `thisweek`, `startof:week` and `/week`.
    pub week_start: WeekStartDay,
    /// Days selected by the "working days" weekday group.
    #[serde(with = "filter::weekday_names")]
    pub working_days: WeekdaySet,
    /// Label of a catalog preset to activate when no prior value is given.
    pub default_preset: Option<String>,
    /// How integer timestamps in a prior value are read.
    pub prior_encoding: TimestampEncoding,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            allow_future_dates: false,
            optional_features_enabled: true,
            week_start: WeekStartDay::Monday,
            working_days: WeekdaySet::from_iter([
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ]),
            default_preset: None,
            prior_encoding: TimestampEncoding::Iso8601,
        }
    }
}

impl PickerConfig {
    /// Resolver options derived from this configuration.
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            week_start: self.week_start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PickerConfig::default();
        assert!(!config.allow_future_dates);
        assert!(config.optional_features_enabled);
        assert_eq!(config.week_start, WeekStartDay::Monday);
        assert_eq!(config.working_days.len(), 5);
        assert!(!config.working_days.contains(Weekday::Sat));
        assert!(!config.working_days.contains(Weekday::Sun));
        assert_eq!(config.prior_encoding, TimestampEncoding::Iso8601);
    }

    #[test]
    fn test_config_prior_encoding_from_json() {
        let config: PickerConfig =
            serde_json::from_str(r#"{"prior_encoding": "unix_seconds"}"#).unwrap();
        assert_eq!(config.prior_encoding, TimestampEncoding::UnixSeconds);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: PickerConfig = serde_json::from_str(
            r#"{"allow_future_dates": true, "week_start": "sunday",
                "working_days": ["saturday", "Sunday", "MONDAY", "Tue", "Wednesday"]}"#,
        )
        .unwrap();
        assert!(config.allow_future_dates);
        assert!(config.optional_features_enabled);
        assert_eq!(config.resolve_options().week_start, WeekStartDay::Sunday);
        assert!(config.working_days.contains(Weekday::Sat));
        assert!(!config.working_days.contains(Weekday::Fri));
    }

    #[test]
    fn test_config_rejects_unknown_weekday() {
        let result: Result<PickerConfig, _> =
            serde_json::from_str(r#"{"working_days": ["Funday"]}"#);
        assert!(result.is_err());
    }
}
