//! Error types for the twin-alerts crate.

use thiserror::Error;

use crate::alert::AlertStatus;

/// Errors that can occur in the alerting subsystem.
#[derive(Debug, Error)]
pub enum AlertError {
    /// An illegal alert-status transition was attempted.
    #[error("invalid alert transition from {from} to {attempted}")]
    InvalidTransition {
        /// The alert's current status.
        from: AlertStatus,
        /// The status the caller attempted to move to.
        attempted: AlertStatus,
    },

    /// Alert with the given ID was not found.
    #[error("alert not found: {id}")]
    AlertNotFound {
        /// The alert ID that was not found.
        id: String,
    },

    /// An open alert already exists for the `(patient, rule)` pair.
    #[error("open alert already exists for patient {patient_id} and rule {rule_id}")]
    DuplicateOpenAlert {
        /// The patient the alert belongs to.
        patient_id: String,
        /// The rule that raised the alert.
        rule_id: String,
    },

    /// Alert storage failed.
    #[error("alert storage error: {reason}")]
    Storage {
        /// The reason the storage operation failed.
        reason: String,
    },

    /// An observer failed to process a notification.
    #[error("observer '{observer}' failed: {reason}")]
    Notification {
        /// The observer that failed.
        observer: String,
        /// The reason the notification failed.
        reason: String,
    },
}

/// Result type for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;
