//! Error types for the dose_core library.

use std::io;
use uuid::Uuid;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dose_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed medication schedule (quantity, frequency, cadence or start date)
    #[error("Invalid schedule config: {0}")]
    InvalidScheduleConfig(String),

    /// A required field was missing or an argument was out of range
    #[error("Validation error: {0}")]
    Validation(String),

    /// A record id was not present in the store
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn dose_not_found(id: Uuid) -> Self {
        Error::NotFound { kind: "Dose", id }
    }

    pub(crate) fn medication_not_found(id: Uuid) -> Self {
        Error::NotFound {
            kind: "Medication",
            id,
        }
    }

    pub(crate) fn patient_not_found(id: Uuid) -> Self {
        Error::NotFound { kind: "Patient", id }
    }
}
