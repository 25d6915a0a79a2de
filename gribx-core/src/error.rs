//! Error types for gribx-core

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Axis sizes that cannot address a sparse array
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Index tuple outside the declared axis bounds
    #[error("Index out of range: {0}")]
    IndexOutOfRange(String),

    /// Search or finish against an axis with no values
    #[error("Empty axis: {0}")]
    EmptyAxis(String),

    /// Value absent from a finished axis.
    ///
    /// Indicates a scan/finish inconsistency, not bad input data.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A runtime coordinate duplicated the running union
    #[error("Union conflict: {0}")]
    UnionConflict(String),

    /// Value that cannot be ordered or does not match the axis type
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Record does not carry a value for the requested axis
    #[error("Missing value: {0}")]
    MissingValue(String),

    /// Build stopped through a cancel token
    #[error("Build cancelled")]
    Cancelled,
}

impl Error {
    /// Create an invalid shape error
    pub fn invalid_shape(msg: impl Into<String>) -> Self {
        Error::InvalidShape(msg.into())
    }

    /// Create an index out of range error
    pub fn index_out_of_range(msg: impl Into<String>) -> Self {
        Error::IndexOutOfRange(msg.into())
    }

    /// Create an empty axis error
    pub fn empty_axis(msg: impl Into<String>) -> Self {
        Error::EmptyAxis(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Create a union conflict error
    pub fn union_conflict(msg: impl Into<String>) -> Self {
        Error::UnionConflict(msg.into())
    }

    /// Create an invalid value error
    pub fn invalid_value(msg: impl Into<String>) -> Self {
        Error::InvalidValue(msg.into())
    }

    /// Create a missing value error
    pub fn missing_value(msg: impl Into<String>) -> Self {
        Error::MissingValue(msg.into())
    }
}
