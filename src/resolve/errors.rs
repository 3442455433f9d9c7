//! Resolver errors
//!
//! These carry no tree position; the walker attaches the path when it turns
//! them into `TreeError`s.

use thiserror::Error;

/// Result type for resolver operations
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Why a value could not be given a storage type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("unsupported value shape: {0}")]
    UnsupportedValueShape(String),

    #[error("{dtype} cannot hold values in [{min}, {max}]")]
    RangeOverflow { dtype: String, min: f64, max: f64 },

    #[error("{dtype} cannot hold missing values; request a float type")]
    MissingRequiresFloat { dtype: String },

    #[error("fixed-length text cannot hold missing values")]
    MissingInFixedText,

    #[error("categorical value has a missing code")]
    UnrepresentableMissingCategorical,

    #[error("invalid categorical value: {0}")]
    InvalidCategorical(String),

    #[error("record has no columns")]
    EmptyRecord,

    #[error("record column '{column}' has {found} rows, expected {expected}")]
    RaggedRecord {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("type request '{spec}' does not apply to a {class} value")]
    IncompatibleOverride { spec: String, class: String },
}
