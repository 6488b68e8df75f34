//! Core types for biometric measurements.
//!
//! This module provides the fundamental types of the data plane:
//! - [`PatientId`]: opaque patient identifier
//! - [`BiometricKind`]: the enumerated measurement signals
//! - [`BiometricValue`]: a numeric or qualitative measurement value
//! - [`BiometricDataPoint`]: one immutable measurement

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BiometricsError, Result};

/// Opaque identifier for a patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(Uuid);

impl PatientId {
    /// Generates a fresh patient identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PatientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PatientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of physiological or behavioral signal a measurement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiometricKind {
    /// Heart rate in beats per minute.
    HeartRate,
    /// Blood pressure (systolic, as the primary numeric signal).
    BloodPressure,
    /// Respiratory rate in breaths per minute.
    RespiratoryRate,
    /// Blood oxygen saturation as a percentage.
    BloodOxygen,
    /// Body temperature in degrees Celsius.
    BodyTemperature,
    /// Sleep quality score (0-100).
    SleepQuality,
    /// Sleep duration in hours.
    SleepDuration,
    /// Activity level score (0-100).
    ActivityLevel,
    /// Stress level score (0-100).
    StressLevel,
    /// Self-reported or inferred mood.
    Mood,
}

impl BiometricKind {
    /// Returns the kind as its wire-format string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HeartRate => "heart_rate",
            Self::BloodPressure => "blood_pressure",
            Self::RespiratoryRate => "respiratory_rate",
            Self::BloodOxygen => "blood_oxygen",
            Self::BodyTemperature => "body_temperature",
            Self::SleepQuality => "sleep_quality",
            Self::SleepDuration => "sleep_duration",
            Self::ActivityLevel => "activity_level",
            Self::StressLevel => "stress_level",
            Self::Mood => "mood",
        }
    }
}

impl std::fmt::Display for BiometricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A measurement value.
///
/// Most signals are numeric; qualitative signals (e.g. mood labels coming
/// from an NLP pipeline) arrive as text and must be mapped to an ordinal
/// scale upstream before they can participate in threshold comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BiometricValue {
    /// A numeric measurement.
    Numeric(f64),
    /// A qualitative label.
    Text(String),
}

impl BiometricValue {
    /// Returns the numeric value, if this is a numeric measurement.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}

impl From<f64> for BiometricValue {
    fn from(v: f64) -> Self {
        Self::Numeric(v)
    }
}

impl std::fmt::Display for BiometricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// One timestamped biometric measurement.
///
/// Data points are immutable once constructed and are ordered by timestamp
/// within a patient's stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiometricDataPoint {
    /// The patient this measurement belongs to.
    pub patient_id: PatientId,
    /// The measured signal.
    #[serde(rename = "data_type")]
    pub kind: BiometricKind,
    /// The measured value.
    pub value: BiometricValue,
    /// When the measurement was taken.
    pub timestamp: DateTime<Utc>,
    /// The device or system that produced the measurement.
    pub source: String,
    /// Measurement confidence in `0.0..=1.0`.
    pub confidence: f64,
    /// Opaque per-point metadata.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl BiometricDataPoint {
    /// Creates a new data point timestamped now, with full confidence.
    #[must_use]
    pub fn new(
        patient_id: PatientId,
        kind: BiometricKind,
        value: BiometricValue,
        source: impl Into<String>,
    ) -> Self {
        Self {
            patient_id,
            kind,
            value,
            timestamp: Utc::now(),
            source: source.into(),
            confidence: 1.0,
            metadata: HashMap::new(),
        }
    }

    /// Sets an explicit measurement timestamp.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Sets the measurement confidence.
    ///
    /// # Errors
    ///
    /// Returns `BiometricsError::InvalidConfidence` if the value is outside
    /// `0.0..=1.0` or not finite.
    pub fn with_confidence(mut self, confidence: f64) -> Result<Self> {
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(BiometricsError::InvalidConfidence { value: confidence });
        }
        self.confidence = confidence;
        Ok(self)
    }

    /// Attaches a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns the numeric value, if the measurement is numeric.
    #[must_use]
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.as_f64()
    }
}
