//! # range-picker
//!
//! Date/time range picking without the widget.
//!
//! Resolves symbolic time expressions (`offset:-7days`, `startof:month`,
//! `offset:-1weeks/week`) against a supplied "now", ships the catalog of
//! preset ranges, and drives the state machine that turns calendar clicks,
//! preset activations and manual edits into one committed range with
//! optional weekday and hour-of-day filters.
//!
//! ## Modules
//!
//! - [`offset`] — Offset expression grammar and resolution
//! - [`preset`] — Preset catalogs, preset resolution, reverse matching
//! - [`filter`] — Weekday sets and groups, hour-of-day presets
//! - [`selection`] — The range-selection state machine
//! - [`value`] — Prior/committed value exchanged with the UI
//! - [`config`] — Per-session feature flags
//! - [`error`] — Error types

pub mod config;
pub mod error;
pub mod filter;
pub mod offset;
pub mod preset;
pub mod selection;
pub mod value;

pub use config::PickerConfig;
pub use error::PickerError;
pub use filter::{HourPreset, WeekdayGroup, WeekdaySet};
pub use offset::{
    parse, resolve, resolve_bound, resolve_bound_with_options, resolve_with_options, Edge,
    OffsetExpr, ResolveOptions, WeekStartDay,
};
pub use preset::{
    catalog, find_preset, match_relative_preset, select_time_range, ResolvedRange, TimeRange,
};
pub use selection::{PickingPhase, RangeSelection, Side};
pub use value::{HourWindow, PickerResult, PickerValue, TimeValue, TimestampEncoding};
