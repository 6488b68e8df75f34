//! Biometric rules: clinician-defined alerting policies.
//!
//! This module provides the fundamental policy types:
//! - [`AlertPriority`]: the clinical urgency assigned to raised alerts
//! - [`LogicalOperator`]: flat AND/OR combination across conditions
//! - [`BiometricRule`]: the policy entity, built via [`RuleBuilder`]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use twin_biometrics::PatientId;

use crate::condition::RuleCondition;
use crate::error::{Result, RuleError};

/// Opaque identifier for a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(Uuid);

impl RuleId {
    /// Generates a fresh rule identifier.
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

impl Default for RuleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier for the provider who authored a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(Uuid);

impl ProviderId {
    /// Generates a fresh provider identifier.
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

impl Default for ProviderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The clinical priority of alerts raised by a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertPriority {
    /// Informational only, no action expected.
    Informational,
    /// Should be reviewed during normal workflow.
    #[default]
    Warning,
    /// Requires prompt clinical attention.
    Urgent,
    /// Requires immediate clinical attention.
    Critical,
}

impl AlertPriority {
    /// Returns the priority as its wire-format string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Informational => "INFORMATIONAL",
            Self::Warning => "WARNING",
            Self::Urgent => "URGENT",
            Self::Critical => "CRITICAL",
        }
    }

    /// Returns the rank of this priority (higher = more urgent).
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Informational => 1,
            Self::Warning => 2,
            Self::Urgent => 3,
            Self::Critical => 4,
        }
    }
}

impl std::fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a rule combines its condition results.
///
/// Combination is flat across all conditions; nested grouping is not
/// supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogicalOperator {
    /// Every condition must match.
    #[default]
    And,
    /// At least one condition must match.
    Or,
}

impl LogicalOperator {
    /// Combines a sequence of condition results.
    #[must_use]
    pub fn combine(&self, results: impl IntoIterator<Item = bool>) -> bool {
        match self {
            Self::And => results.into_iter().all(|r| r),
            Self::Or => results.into_iter().any(|r| r),
        }
    }

    /// Returns the value at which combination can short-circuit.
    ///
    /// AND stops at the first `false`; OR stops at the first `true`.
    #[must_use]
    pub const fn short_circuits_on(&self) -> bool {
        matches!(self, Self::Or)
    }
}

impl std::fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

/// A clinician-defined alerting policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiometricRule {
    /// Unique identifier for the rule.
    pub id: RuleId,
    /// Human-readable name.
    pub name: String,
    /// Clinical description, copied into raised alerts.
    pub description: String,
    /// Ordered, non-empty list of conditions.
    pub conditions: Vec<RuleCondition>,
    /// How condition results are combined.
    pub logical_operator: LogicalOperator,
    /// The priority assigned to alerts raised by this rule.
    #[serde(rename = "alert_priority")]
    pub priority: AlertPriority,
    /// The provider who authored the rule.
    pub provider_id: ProviderId,
    /// The patient the rule is bound to; `None` means unbound.
    pub patient_id: Option<PatientId>,
    /// When the rule was created.
    pub created_at: DateTime<Utc>,
    /// When the rule was last modified.
    pub updated_at: DateTime<Utc>,
    /// Whether the rule participates in evaluation.
    pub active: bool,
}

impl BiometricRule {
    /// Maximum allowed length for rule names.
    pub const MAX_NAME_LENGTH: usize = 256;

    /// Creates a new rule builder.
    pub fn builder(name: impl Into<String>, provider_id: ProviderId) -> RuleBuilder {
        RuleBuilder::new(name, provider_id)
    }

    /// Returns true if the rule is bound to a patient.
    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.patient_id.is_some()
    }

    /// Soft-deletes the rule.
    ///
    /// Deactivated rules are never evaluated but remain referenced by
    /// historical alerts.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.updated_at = Utc::now();
    }
}

/// Builder for creating [`BiometricRule`] instances.
#[derive(Debug)]
pub struct RuleBuilder {
    name: String,
    description: String,
    conditions: Vec<RuleCondition>,
    logical_operator: LogicalOperator,
    priority: AlertPriority,
    provider_id: ProviderId,
    patient_id: Option<PatientId>,
    active: bool,
}

impl RuleBuilder {
    fn new(name: impl Into<String>, provider_id: ProviderId) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            conditions: Vec::new(),
            logical_operator: LogicalOperator::And,
            priority: AlertPriority::Warning,
            provider_id,
            patient_id: None,
            active: true,
        }
    }

    /// Sets the clinical description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Appends a condition.
    #[must_use]
    pub fn condition(mut self, condition: RuleCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Appends multiple conditions.
    #[must_use]
    pub fn conditions(mut self, conditions: impl IntoIterator<Item = RuleCondition>) -> Self {
        self.conditions.extend(conditions);
        self
    }

    /// Sets the logical operator.
    #[must_use]
    pub const fn logical_operator(mut self, op: LogicalOperator) -> Self {
        self.logical_operator = op;
        self
    }

    /// Sets the alert priority.
    #[must_use]
    pub const fn priority(mut self, priority: AlertPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Binds the rule to a patient.
    #[must_use]
    pub const fn patient(mut self, patient_id: PatientId) -> Self {
        self.patient_id = Some(patient_id);
        self
    }

    /// Sets whether the rule is active.
    #[must_use]
    pub const fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Builds the [`BiometricRule`].
    ///
    /// # Errors
    ///
    /// Returns `RuleError::InvalidRule` if:
    /// - The name is empty or exceeds the maximum length
    /// - The condition list is empty
    pub fn build(self) -> Result<BiometricRule> {
        if self.name.is_empty() {
            return Err(RuleError::InvalidRule {
                reason: "rule name cannot be empty".to_string(),
            });
        }

        if self.name.len() > BiometricRule::MAX_NAME_LENGTH {
            return Err(RuleError::InvalidRule {
                reason: format!(
                    "rule name exceeds maximum length of {} characters",
                    BiometricRule::MAX_NAME_LENGTH
                ),
            });
        }

        if self.conditions.is_empty() {
            return Err(RuleError::InvalidRule {
                reason: "rule must have at least one condition".to_string(),
            });
        }

        let now = Utc::now();
        Ok(BiometricRule {
            id: RuleId::new(),
            name: self.name,
            description: self.description,
            conditions: self.conditions,
            logical_operator: self.logical_operator,
            priority: self.priority,
            provider_id: self.provider_id,
            patient_id: self.patient_id,
            created_at: now,
            updated_at: now,
            active: self.active,
        })
    }
}
