//! Alert persistence seam and in-memory implementation.
//!
//! The repository's `save` is conditional: it rejects a second open alert
//! for the same `(patient, rule)` pair. Together with the engine's
//! per-patient serialization this makes deduplication race-free; a
//! database-backed implementation would express the same guarantee as a
//! conditional insert.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use twin_biometrics::PatientId;
use twin_rules::RuleId;

use crate::alert::{AlertId, BiometricAlert};
use crate::error::{AlertError, Result};

/// Storage for alerts.
pub trait AlertRepository: Send + Sync {
    /// Persists a new alert.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::DuplicateOpenAlert` if an open alert already
    /// exists for the alert's `(patient, rule)` pair.
    fn save(&self, alert: &BiometricAlert) -> Result<()>;

    /// Fetches an alert by ID.
    fn get(&self, alert_id: AlertId) -> Result<Option<BiometricAlert>>;

    /// Persists a mutation to an existing alert.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::AlertNotFound` if the alert was never saved.
    fn update(&self, alert: &BiometricAlert) -> Result<()>;

    /// Returns the open alert for the `(patient, rule)` pair, if any.
    fn open_alert(&self, patient_id: PatientId, rule_id: RuleId)
        -> Result<Option<BiometricAlert>>;

    /// Returns all alerts for a patient.
    fn alerts_for_patient(&self, patient_id: PatientId) -> Result<Vec<BiometricAlert>>;
}

type OpenPairIndex = HashMap<(PatientId, RuleId), AlertId>;

/// Thread-safe in-memory alert storage.
#[derive(Debug, Default)]
pub struct MemoryAlertRepository {
    alerts: Arc<RwLock<HashMap<AlertId, BiometricAlert>>>,
    /// Index of currently-open alerts per `(patient, rule)` pair.
    open_pairs: Arc<RwLock<OpenPairIndex>>,
}

impl MemoryAlertRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored alerts.
    #[must_use]
    pub fn alert_count(&self) -> usize {
        let alerts = self.alerts.read();
        alerts.len()
    }
}

impl AlertRepository for MemoryAlertRepository {
    fn save(&self, alert: &BiometricAlert) -> Result<()> {
        let pair = (alert.patient_id, alert.rule_id);

        let mut alerts = self.alerts.write();
        let mut open_pairs = self.open_pairs.write();

        if alert.is_open() {
            if open_pairs.contains_key(&pair) {
                return Err(AlertError::DuplicateOpenAlert {
                    patient_id: alert.patient_id.to_string(),
                    rule_id: alert.rule_id.to_string(),
                });
            }
            open_pairs.insert(pair, alert.id);
        }

        debug!(alert_id = %alert.id, patient_id = %alert.patient_id, "saved alert");
        alerts.insert(alert.id, alert.clone());
        Ok(())
    }

    fn get(&self, alert_id: AlertId) -> Result<Option<BiometricAlert>> {
        let alerts = self.alerts.read();
        Ok(alerts.get(&alert_id).cloned())
    }

    fn update(&self, alert: &BiometricAlert) -> Result<()> {
        let pair = (alert.patient_id, alert.rule_id);

        let mut alerts = self.alerts.write();
        let mut open_pairs = self.open_pairs.write();

        if !alerts.contains_key(&alert.id) {
            return Err(AlertError::AlertNotFound {
                id: alert.id.to_string(),
            });
        }

        if alert.is_open() {
            open_pairs.insert(pair, alert.id);
        } else if open_pairs.get(&pair) == Some(&alert.id) {
            open_pairs.remove(&pair);
        }

        alerts.insert(alert.id, alert.clone());
        Ok(())
    }

    fn open_alert(
        &self,
        patient_id: PatientId,
        rule_id: RuleId,
    ) -> Result<Option<BiometricAlert>> {
        let open_pairs = self.open_pairs.read();
        let Some(alert_id) = open_pairs.get(&(patient_id, rule_id)) else {
            return Ok(None);
        };

        let alerts = self.alerts.read();
        Ok(alerts.get(alert_id).cloned())
    }

    fn alerts_for_patient(&self, patient_id: PatientId) -> Result<Vec<BiometricAlert>> {
        let alerts = self.alerts.read();
        let mut matching: Vec<BiometricAlert> = alerts
            .values()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect();
        matching.sort_by_key(|a| a.created_at);
        Ok(matching)
    }
}

impl Clone for MemoryAlertRepository {
    fn clone(&self) -> Self {
        Self {
            alerts: Arc::clone(&self.alerts),
            open_pairs: Arc::clone(&self.open_pairs),
        }
    }
}
