//! In-memory biometric series storage with retention.
//!
//! This module provides the [`SeriesStore`], a thread-safe buffer of recent
//! measurements keyed by `(patient, kind)`. Points older than the configured
//! retention are expired during record operations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{BiometricsError, Result};
use crate::source::BiometricSource;
use crate::types::{BiometricDataPoint, BiometricKind, PatientId};

type SeriesKey = (PatientId, BiometricKind);

/// Thread-safe in-memory storage for biometric series.
///
/// Points are kept in timestamp order per `(patient, kind)` series and
/// expired once they fall outside the retention horizon. All operations are
/// safe for concurrent access.
#[derive(Debug)]
pub struct SeriesStore {
    /// Retention horizon in seconds.
    retention_secs: i64,
    /// Series data keyed by patient and signal kind.
    data: Arc<RwLock<HashMap<SeriesKey, Vec<BiometricDataPoint>>>>,
}

impl SeriesStore {
    /// Creates a new store with the given retention duration.
    #[must_use]
    pub fn new(retention: Duration) -> Self {
        Self {
            retention_secs: retention.as_secs() as i64,
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the retention horizon in seconds.
    #[must_use]
    pub const fn retention_secs(&self) -> i64 {
        self.retention_secs
    }

    /// Records a measurement, maintaining timestamp order and expiring old
    /// points in the same series.
    ///
    /// # Errors
    ///
    /// Returns `BiometricsError::InvalidValue` for a non-finite numeric
    /// measurement; NaN and infinities from a misbehaving device would
    /// otherwise poison every aggregation over the series.
    pub fn record(&self, point: BiometricDataPoint) -> Result<()> {
        if point.numeric_value().is_some_and(|v| !v.is_finite()) {
            return Err(BiometricsError::InvalidValue {
                reason: format!("non-finite {} measurement from {}", point.kind, point.source),
            });
        }

        let cutoff = Utc::now() - chrono::Duration::seconds(self.retention_secs);
        let key = (point.patient_id, point.kind);

        let mut data = self.data.write();
        let series = data.entry(key).or_default();

        series.retain(|p| p.timestamp >= cutoff);

        // Out-of-order device uploads happen; keep the series sorted.
        let insert_pos = series
            .binary_search_by_key(&point.timestamp, |p| p.timestamp)
            .unwrap_or_else(|pos| pos);
        series.insert(insert_pos, point);

        debug!(
            patient_id = %key.0,
            kind = %key.1,
            series_len = series.len(),
            "recorded biometric point"
        );

        Ok(())
    }

    /// Returns the number of retained points for a series.
    #[must_use]
    pub fn series_len(&self, patient_id: PatientId, kind: BiometricKind) -> usize {
        let data = self.data.read();
        data.get(&(patient_id, kind)).map_or(0, Vec::len)
    }

    /// Clears all series.
    pub fn clear(&self) {
        let mut data = self.data.write();
        data.clear();
    }

    /// Expires points older than the retention horizon across all series.
    pub fn expire_old_points(&self) {
        let cutoff = Utc::now() - chrono::Duration::seconds(self.retention_secs);

        let mut data = self.data.write();
        for series in data.values_mut() {
            series.retain(|p| p.timestamp >= cutoff);
        }
        data.retain(|_, series| !series.is_empty());
    }
}

impl BiometricSource for SeriesStore {
    fn recent_points(
        &self,
        patient_id: PatientId,
        kind: BiometricKind,
        since: DateTime<Utc>,
    ) -> Result<Vec<BiometricDataPoint>> {
        let data = self.data.read();
        Ok(data
            .get(&(patient_id, kind))
            .map_or_else(Vec::new, |series| {
                series
                    .iter()
                    .filter(|p| p.timestamp >= since)
                    .cloned()
                    .collect()
            }))
    }

    fn latest_point(
        &self,
        patient_id: PatientId,
        kind: BiometricKind,
    ) -> Result<Option<BiometricDataPoint>> {
        let data = self.data.read();
        Ok(data
            .get(&(patient_id, kind))
            .and_then(|series| series.last().cloned()))
    }
}

impl Clone for SeriesStore {
    fn clone(&self) -> Self {
        Self {
            retention_secs: self.retention_secs,
            data: Arc::clone(&self.data),
        }
    }
}

impl Default for SeriesStore {
    fn default() -> Self {
        // 72 hours covers the largest clinically useful rule window.
        Self::new(Duration::from_secs(72 * 3600))
    }
}
