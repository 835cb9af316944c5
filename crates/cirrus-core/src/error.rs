use thiserror::Error;

/// Validation and contract errors exposed by `cirrus-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("location name cannot be empty")]
    EmptyLocationName,
    #[error("latitude {value} is outside [-90, 90]")]
    LatitudeOutOfRange { value: f64 },
    #[error("longitude {value} is outside [-180, 180]")]
    LongitudeOutOfRange { value: f64 },

    #[error("unknown forecast category code '{value}'")]
    UnknownCategory { value: String },
    #[error("unknown provider '{value}', expected one of kma, openweather")]
    InvalidProvider { value: String },

    #[error("date must be formatted YYYYMMDD: '{value}'")]
    InvalidDate { value: String },
    #[error("time must be formatted HHmm: '{value}'")]
    InvalidTime { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
