//! The read-side abstraction over a patient's biometric history.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{BiometricDataPoint, BiometricKind, PatientId};

/// Read access to a patient's recent biometric history.
///
/// This is the rule engine's only coupling point to persistence. The
/// in-memory [`SeriesStore`](crate::store::SeriesStore) implements it for
/// tests and single-process deployments; a database-backed implementation
/// would satisfy the same contract.
pub trait BiometricSource: Send + Sync {
    /// Returns all points of `kind` for the patient with
    /// `timestamp >= since`, in ascending timestamp order.
    fn recent_points(
        &self,
        patient_id: PatientId,
        kind: BiometricKind,
        since: DateTime<Utc>,
    ) -> Result<Vec<BiometricDataPoint>>;

    /// Returns the single most recent point of `kind` for the patient.
    fn latest_point(
        &self,
        patient_id: PatientId,
        kind: BiometricKind,
    ) -> Result<Option<BiometricDataPoint>>;
}
