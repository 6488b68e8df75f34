//! Open-alert deduplication.
//!
//! A rule that keeps matching while its alert is still open (NEW or
//! ACKNOWLEDGED) must not raise a second alert. The check here runs on
//! the serialized per-patient path, and the repository's conditional
//! save backstops it.

use std::sync::Arc;

use tracing::debug;

use twin_alerts::AlertRepository;
use twin_biometrics::PatientId;
use twin_rules::RuleId;

use crate::error::Result;

/// Decides whether a fresh match should be suppressed.
pub struct Deduplicator {
    repository: Arc<dyn AlertRepository>,
}

impl Deduplicator {
    /// Creates a deduplicator over the given repository.
    #[must_use]
    pub fn new(repository: Arc<dyn AlertRepository>) -> Self {
        Self { repository }
    }

    /// Returns `true` if an open alert already exists for the pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository lookup fails.
    pub fn suppresses(&self, patient_id: PatientId, rule_id: RuleId) -> Result<bool> {
        let open = self.repository.open_alert(patient_id, rule_id)?;
        if let Some(existing) = &open {
            debug!(
                patient_id = %patient_id,
                rule_id = %rule_id,
                alert_id = %existing.id,
                "suppressing duplicate match"
            );
        }
        Ok(open.is_some())
    }
}
