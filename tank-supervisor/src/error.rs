//! Engine error type.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Classification was attempted on a value that is not a finite number.
    #[error("parameter '{parameter}' does not carry a numeric value")]
    NonNumericValue { parameter: String },

    /// A parameter definition broke the band ordering and was not loaded.
    #[error("invalid definition '{id}': {reason}")]
    InvalidDefinition { id: String, reason: String },

    /// The catalog source could not be read or parsed at all.
    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("invalid setpoint for {field}: {value}")]
    InvalidSetpoint { field: &'static str, value: f64 },
}

pub type EngineResult<T> = Result<T, EngineError>;
