//! Error types for the twin-rules crate.

use thiserror::Error;

/// Errors that can occur while authoring or looking up rules.
#[derive(Debug, Error)]
pub enum RuleError {
    /// Invalid rule or condition configuration.
    #[error("invalid rule: {reason}")]
    InvalidRule {
        /// The reason the rule is invalid.
        reason: String,
    },

    /// Rule with the given ID was not found.
    #[error("rule not found: {id}")]
    RuleNotFound {
        /// The rule ID that was not found.
        id: String,
    },

    /// Template with the given ID is not registered.
    #[error("unknown template: {id}")]
    UnknownTemplate {
        /// The template ID that was not found.
        id: String,
    },

    /// A required template parameter was not supplied.
    #[error("missing template parameter: {name}")]
    MissingParameter {
        /// The name of the absent parameter.
        name: String,
    },
}

/// Result type for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;
