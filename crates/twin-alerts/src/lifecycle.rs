//! Alert lifecycle operations over a repository.
//!
//! [`AlertLifecycle`] is the entry point care-team tooling uses to move an
//! alert through its state machine. Each operation loads the alert,
//! applies the transition, and persists the result; the transition rules
//! themselves live on [`BiometricAlert`].

use std::sync::Arc;

use tracing::info;

use crate::alert::{AlertId, BiometricAlert};
use crate::error::{AlertError, Result};
use crate::repository::AlertRepository;

/// Applies status transitions to stored alerts.
pub struct AlertLifecycle {
    repository: Arc<dyn AlertRepository>,
}

impl AlertLifecycle {
    /// Creates a lifecycle handler over the given repository.
    #[must_use]
    pub fn new(repository: Arc<dyn AlertRepository>) -> Self {
        Self { repository }
    }

    /// Marks an alert as acknowledged by the given user.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::AlertNotFound` if the alert does not exist, or
    /// `AlertError::InvalidTransition` if it is not in the NEW state.
    pub fn acknowledge(
        &self,
        alert_id: AlertId,
        user_id: impl Into<String>,
    ) -> Result<BiometricAlert> {
        let mut alert = self.load(alert_id)?;
        let user_id = user_id.into();
        alert.acknowledge(user_id.clone())?;
        self.repository.update(&alert)?;
        info!(alert_id = %alert.id, user_id = %user_id, "alert acknowledged");
        Ok(alert)
    }

    /// Marks an acknowledged alert as resolved.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::AlertNotFound` if the alert does not exist, or
    /// `AlertError::InvalidTransition` if it is not in the ACKNOWLEDGED
    /// state.
    pub fn resolve(
        &self,
        alert_id: AlertId,
        user_id: impl Into<String>,
        notes: Option<String>,
    ) -> Result<BiometricAlert> {
        let mut alert = self.load(alert_id)?;
        let user_id = user_id.into();
        alert.resolve(user_id.clone(), notes)?;
        self.repository.update(&alert)?;
        info!(alert_id = %alert.id, user_id = %user_id, "alert resolved");
        Ok(alert)
    }

    /// Dismisses a NEW alert as not clinically actionable.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::AlertNotFound` if the alert does not exist, or
    /// `AlertError::InvalidTransition` if it is not in the NEW state.
    pub fn dismiss(
        &self,
        alert_id: AlertId,
        user_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Result<BiometricAlert> {
        let mut alert = self.load(alert_id)?;
        let user_id = user_id.into();
        alert.dismiss(user_id.clone(), reason)?;
        self.repository.update(&alert)?;
        info!(alert_id = %alert.id, user_id = %user_id, "alert dismissed");
        Ok(alert)
    }

    fn load(&self, alert_id: AlertId) -> Result<BiometricAlert> {
        self.repository
            .get(alert_id)?
            .ok_or_else(|| AlertError::AlertNotFound {
                id: alert_id.to_string(),
            })
    }
}
