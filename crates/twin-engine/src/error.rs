//! Error types for the twin-engine crate.

use thiserror::Error;

/// Errors that can occur while running the evaluation pipeline.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A biometric storage or validation error.
    #[error(transparent)]
    Biometrics(#[from] twin_biometrics::BiometricsError),

    /// A rule definition or catalog error.
    #[error(transparent)]
    Rules(#[from] twin_rules::RuleError),

    /// An alert storage or lifecycle error.
    #[error(transparent)]
    Alerts(#[from] twin_alerts::AlertError),

    /// Evaluating a single rule exceeded the configured deadline.
    #[error("evaluation of rule {rule_id} timed out")]
    EvaluationTimeout {
        /// The rule whose evaluation timed out.
        rule_id: String,
    },

    /// The ingestion pipeline could not accept or process a data point.
    #[error("ingestion failed: {reason}")]
    Ingest {
        /// The reason ingestion failed.
        reason: String,
    },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
