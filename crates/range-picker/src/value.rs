//! The value exchanged with the surrounding UI: an optional prior value on
//! open, the committed value on submit.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PickerError, Result};
use crate::filter::WeekdaySet;
use crate::offset::{self, localize, OffsetExpr};

/// A timestamp on the wire: an ISO 8601 string or an integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Number(i64),
    Text(String),
}

impl TimeValue {
    /// Interpret the value as an instant in `tz`.
    ///
    /// `encoding` says what integers count: seconds for `UnixSeconds`,
    /// milliseconds otherwise. Text is read the same way under every
    /// encoding. Returns `None` for text that is not a literal date-time or
    /// for an out-of-range number.
    pub fn to_datetime<Tz: TimeZone>(
        &self,
        tz: &Tz,
        encoding: TimestampEncoding,
    ) -> Option<DateTime<Tz>> {
        match self {
            TimeValue::Number(n) => {
                let utc = match encoding {
                    TimestampEncoding::UnixSeconds => DateTime::<Utc>::from_timestamp(*n, 0),
                    TimestampEncoding::Iso8601 | TimestampEncoding::UnixMillis => {
                        DateTime::<Utc>::from_timestamp_millis(*n)
                    }
                };
                utc.map(|dt| dt.with_timezone(tz))
            }
            TimeValue::Text(text) => match offset::parse(text)? {
                OffsetExpr::Literal(dt) => Some(dt.with_timezone(tz)),
                OffsetExpr::LocalLiteral(naive) => localize(tz, naive),
                _ => None,
            },
        }
    }
}

/// How committed instants are written out. Chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampEncoding {
    /// UTC, millisecond precision, `Z` suffix: `2024-06-14T00:00:00.000Z`.
    #[default]
    Iso8601,
    /// Integer seconds since the Unix epoch.
    UnixSeconds,
    /// Integer milliseconds since the Unix epoch.
    UnixMillis,
}

impl TimestampEncoding {
    pub fn encode<Tz: TimeZone>(self, dt: &DateTime<Tz>) -> TimeValue {
        match self {
            TimestampEncoding::Iso8601 => TimeValue::Text(
                dt.with_timezone(&Utc)
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
            TimestampEncoding::UnixSeconds => TimeValue::Number(dt.timestamp()),
            TimestampEncoding::UnixMillis => TimeValue::Number(dt.timestamp_millis()),
        }
    }
}

/// Range plus optional filters, as exchanged with the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickerValue {
    #[serde(alias = "start_datetime")]
    pub start: TimeValue,
    #[serde(alias = "end_datetime")]
    pub end: TimeValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_days: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_hour: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_minute: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_hour: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_minute: Option<u32>,
}

impl PickerValue {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| PickerError::InvalidValue(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| PickerError::InvalidValue(e.to_string()))
    }
}

/// Hour-of-day window carried by a committed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourWindow {
    pub start_hour: u32,
    pub start_minute: u32,
    pub end_hour: u32,
    pub end_minute: u32,
}

/// The committed outcome of a picking session.
#[derive(Debug, Clone, PartialEq)]
pub struct PickerResult<Tz: TimeZone> {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    /// Present only when the weekday filter was enabled.
    pub week_days: Option<WeekdaySet>,
    /// Present only when the hour filter was enabled.
    pub hours: Option<HourWindow>,
}

impl<Tz: TimeZone> PickerResult<Tz> {
    /// Encode for the UI with the caller's timestamp encoding.
    pub fn to_value(&self, encoding: TimestampEncoding) -> PickerValue {
        PickerValue {
            start: encoding.encode(&self.start),
            end: encoding.encode(&self.end),
            week_days: self.week_days.map(WeekdaySet::names),
            start_hour: self.hours.map(|h| h.start_hour),
            start_minute: self.hours.map(|h| h.start_minute),
            end_hour: self.hours.map(|h| h.end_hour),
            end_minute: self.hours.map(|h| h.end_minute),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, Weekday};

    fn sample() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 14, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_encode_iso8601() {
        let end = Utc.with_ymd_and_hms(2024, 6, 14, 23, 59, 59).unwrap() + Duration::milliseconds(999);
        assert_eq!(
            TimestampEncoding::Iso8601.encode(&end),
            TimeValue::Text("2024-06-14T23:59:59.999Z".to_string())
        );
    }

    #[test]
    fn test_encode_iso8601_converts_to_utc() {
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        let local = tz.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        assert_eq!(
            TimestampEncoding::Iso8601.encode(&local),
            TimeValue::Text("2024-06-14T16:00:00.000Z".to_string())
        );
    }

    #[test]
    fn test_encode_unix() {
        assert_eq!(
            TimestampEncoding::UnixSeconds.encode(&sample()),
            TimeValue::Number(1_718_323_200)
        );
        assert_eq!(
            TimestampEncoding::UnixMillis.encode(&sample()),
            TimeValue::Number(1_718_323_200_000)
        );
    }

    #[test]
    fn test_time_value_to_datetime() {
        let iso = TimestampEncoding::Iso8601;
        assert_eq!(
            TimeValue::Number(1_718_323_200_000).to_datetime(&Utc, iso),
            Some(sample())
        );
        assert_eq!(
            TimeValue::Text("2024-06-14T00:00:00.000Z".into()).to_datetime(&Utc, iso),
            Some(sample())
        );
        assert_eq!(
            TimeValue::Text("2024-06-14".into()).to_datetime(&Utc, iso),
            Some(sample())
        );
        assert_eq!(TimeValue::Text("offset:now".into()).to_datetime(&Utc, iso), None);
        assert_eq!(TimeValue::Text("not a date".into()).to_datetime(&Utc, iso), None);
    }

    #[test]
    fn test_number_unit_follows_encoding() {
        let value = TimeValue::Number(1_718_323_200);
        assert_eq!(
            value.to_datetime(&Utc, TimestampEncoding::UnixSeconds),
            Some(sample())
        );
        let as_millis = value.to_datetime(&Utc, TimestampEncoding::UnixMillis).unwrap();
        assert_eq!(as_millis.timestamp_millis(), 1_718_323_200);
    }

    #[test]
    fn test_each_encoding_reads_back() {
        let instant = Utc.with_ymd_and_hms(2024, 6, 10, 23, 59, 59).unwrap();
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        for encoding in [
            TimestampEncoding::Iso8601,
            TimestampEncoding::UnixSeconds,
            TimestampEncoding::UnixMillis,
        ] {
            let encoded = encoding.encode(&instant);
            assert_eq!(
                encoded.to_datetime(&tz, encoding),
                Some(instant.with_timezone(&tz)),
                "{encoding:?}"
            );
        }
    }

    #[test]
    fn test_picker_value_accepts_legacy_field_names() {
        let value = PickerValue::from_json(
            r#"{"start_datetime": "2024-06-01T00:00:00Z", "end_datetime": 1718323200000,
                "week_days": ["Monday"], "start_hour": 9, "end_hour": 17}"#,
        )
        .unwrap();
        assert_eq!(value.start, TimeValue::Text("2024-06-01T00:00:00Z".into()));
        assert_eq!(value.end, TimeValue::Number(1_718_323_200_000));
        assert_eq!(value.week_days, Some(vec!["Monday".to_string()]));
        assert_eq!(value.start_hour, Some(9));
        assert_eq!(value.start_minute, None);
    }

    #[test]
    fn test_picker_value_rejects_garbage() {
        let err = PickerValue::from_json(r#"{"start": true}"#).unwrap_err();
        assert!(err.to_string().contains("Invalid value"), "got: {err}");
    }

    #[test]
    fn test_result_to_value_omits_absent_filters() {
        let result = PickerResult {
            start: sample(),
            end: sample() + Duration::days(1),
            week_days: None,
            hours: None,
        };
        let json = serde_json::to_value(result.to_value(TimestampEncoding::Iso8601)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "start": "2024-06-14T00:00:00.000Z",
                "end": "2024-06-15T00:00:00.000Z"
            })
        );
    }

    #[test]
    fn test_result_to_value_with_filters() {
        let result = PickerResult {
            start: sample(),
            end: sample(),
            week_days: Some(WeekdaySet::from_iter([Weekday::Mon, Weekday::Sat])),
            hours: Some(HourWindow {
                start_hour: 9,
                start_minute: 30,
                end_hour: 17,
                end_minute: 0,
            }),
        };
        let value = result.to_value(TimestampEncoding::UnixSeconds);
        assert_eq!(
            value.week_days,
            Some(vec!["Saturday".to_string(), "Monday".to_string()])
        );
        assert_eq!(value.start_minute, Some(30));
        assert_eq!(value.end_hour, Some(17));
        assert_eq!(value.start, TimeValue::Number(1_718_323_200));
    }
}
