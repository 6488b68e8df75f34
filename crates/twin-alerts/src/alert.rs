//! The alert entity and its status state machine.
//!
//! An alert moves through a monotonic lifecycle:
//!
//! ```text
//! NEW ──acknowledge──▶ ACKNOWLEDGED ──resolve──▶ RESOLVED
//!  │
//!  └──────dismiss──────▶ DISMISSED
//! ```
//!
//! `RESOLVED` and `DISMISSED` are terminal; no transition moves an alert
//! backward. The evaluation pipeline never mutates an alert after creation;
//! status changes come only from clinician action via the lifecycle manager.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use twin_biometrics::{BiometricDataPoint, PatientId};
use twin_rules::{AlertPriority, RuleId};

use crate::error::{AlertError, Result};

/// Opaque identifier for an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(Uuid);

impl AlertId {
    /// Generates a fresh alert identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for AlertId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AlertId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The lifecycle status of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    /// Raised and awaiting clinician attention.
    New,
    /// A clinician has seen the alert and is acting on it.
    Acknowledged,
    /// The underlying situation has been addressed. Terminal.
    Resolved,
    /// Judged spurious and closed without acknowledgment. Terminal.
    Dismissed,
}

impl AlertStatus {
    /// Returns the status as its wire-format string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Acknowledged => "ACKNOWLEDGED",
            Self::Resolved => "RESOLVED",
            Self::Dismissed => "DISMISSED",
        }
    }

    /// Returns true while the alert still demands attention.
    ///
    /// An open alert for a `(patient, rule)` pair suppresses creation of a
    /// duplicate alert for the same violation.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::New | Self::Acknowledged)
    }

    /// Returns true if no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Dismissed)
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A clinically-actionable event raised when a rule matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiometricAlert {
    /// Unique identifier for this alert.
    #[serde(rename = "alert_id")]
    pub id: AlertId,
    /// The patient the alert concerns.
    pub patient_id: PatientId,
    /// The rule that raised the alert.
    pub rule_id: RuleId,
    /// Category label, taken from the triggering rule's name.
    pub alert_type: String,
    /// Clinical description plus a rendered summary of the matched
    /// conditions and observed values.
    pub description: String,
    /// Priority copied from the rule at trigger time; later rule edits do
    /// not retroactively change it.
    pub priority: AlertPriority,
    /// Current lifecycle status.
    pub status: AlertStatus,
    /// When the alert was raised.
    pub created_at: DateTime<Utc>,
    /// When the alert was last mutated.
    pub updated_at: DateTime<Utc>,
    /// Who acknowledged the alert.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,
    /// When the alert was acknowledged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    /// Who resolved the alert.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    /// When the alert was resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Free-text notes recorded at resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_notes: Option<String>,
    /// Who dismissed the alert.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismissed_by: Option<String>,
    /// Why the alert was dismissed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismissal_reason: Option<String>,
    /// The specific measurements that triggered the rule, for audit.
    pub data_points: Vec<BiometricDataPoint>,
    /// Opaque metadata.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl BiometricAlert {
    /// Creates a new alert in the `NEW` state.
    #[must_use]
    pub fn new(
        patient_id: PatientId,
        rule_id: RuleId,
        alert_type: impl Into<String>,
        description: impl Into<String>,
        priority: AlertPriority,
        data_points: Vec<BiometricDataPoint>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AlertId::new(),
            patient_id,
            rule_id,
            alert_type: alert_type.into(),
            description: description.into(),
            priority,
            status: AlertStatus::New,
            created_at: now,
            updated_at: now,
            acknowledged_by: None,
            acknowledged_at: None,
            resolved_by: None,
            resolved_at: None,
            resolution_notes: None,
            dismissed_by: None,
            dismissal_reason: None,
            data_points,
            metadata: HashMap::new(),
        }
    }

    /// Attaches a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns true while the alert still demands attention.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Acknowledges the alert.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidTransition` unless the alert is `NEW`.
    pub fn acknowledge(&mut self, user_id: impl Into<String>) -> Result<()> {
        if self.status != AlertStatus::New {
            return Err(AlertError::InvalidTransition {
                from: self.status,
                attempted: AlertStatus::Acknowledged,
            });
        }

        let now = Utc::now();
        self.status = AlertStatus::Acknowledged;
        self.acknowledged_by = Some(user_id.into());
        self.acknowledged_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Resolves the alert.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidTransition` unless the alert is
    /// `ACKNOWLEDGED`.
    pub fn resolve(&mut self, user_id: impl Into<String>, notes: Option<String>) -> Result<()> {
        if self.status != AlertStatus::Acknowledged {
            return Err(AlertError::InvalidTransition {
                from: self.status,
                attempted: AlertStatus::Resolved,
            });
        }

        let now = Utc::now();
        self.status = AlertStatus::Resolved;
        self.resolved_by = Some(user_id.into());
        self.resolved_at = Some(now);
        self.resolution_notes = notes;
        self.updated_at = now;
        Ok(())
    }

    /// Dismisses the alert without acknowledgment.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidTransition` unless the alert is `NEW`.
    pub fn dismiss(&mut self, user_id: impl Into<String>, reason: impl Into<String>) -> Result<()> {
        if self.status != AlertStatus::New {
            return Err(AlertError::InvalidTransition {
                from: self.status,
                attempted: AlertStatus::Dismissed,
            });
        }

        let now = Utc::now();
        self.status = AlertStatus::Dismissed;
        self.dismissed_by = Some(user_id.into());
        self.dismissal_reason = Some(reason.into());
        self.updated_at = now;
        Ok(())
    }
}
