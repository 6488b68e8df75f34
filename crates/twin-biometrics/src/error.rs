//! Error types for the twin-biometrics crate.

use thiserror::Error;

/// Errors that can occur while handling biometric data.
#[derive(Debug, Error)]
pub enum BiometricsError {
    /// Confidence must lie within `0.0..=1.0`.
    #[error("invalid confidence {value}: must be between 0.0 and 1.0")]
    InvalidConfidence {
        /// The rejected confidence value.
        value: f64,
    },

    /// A non-finite measurement value was supplied.
    #[error("invalid measurement value: {reason}")]
    InvalidValue {
        /// The reason the value is invalid.
        reason: String,
    },

    /// Transient failure reading from a biometric data source.
    #[error("data source error: {reason}")]
    DataSource {
        /// The reason the read failed.
        reason: String,
    },
}

/// Result type for biometric operations.
pub type Result<T> = std::result::Result<T, BiometricsError>;
