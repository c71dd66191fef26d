//! Error types for range-picker operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PickerError {
    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    #[error("Invalid datetime: {0}")]
    InvalidDatetime(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Missing bound: {0}")]
    MissingBound(String),

    #[error("Incomplete range: {0}")]
    IncompleteRange(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, PickerError>;
