//! Parameterized rule templates.
//!
//! A template is a rule blueprint a provider instantiates per patient.
//! Parameters are declared up front with an explicit schema and validated
//! in one pass before any threshold substitution happens, so a template
//! can never be half-instantiated.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use twin_biometrics::{BiometricKind, PatientId};

use crate::condition::{Aggregation, ComparisonOperator, RuleCondition};
use crate::error::{Result, RuleError};
use crate::rule::{AlertPriority, BiometricRule, LogicalOperator, ProviderId};

/// Opaque identifier for a rule template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(Uuid);

impl TemplateId {
    /// Generates a fresh template identifier.
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

impl Default for TemplateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A declared template parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateParameter {
    /// Parameter name, referenced by condition thresholds.
    pub name: String,
    /// What the parameter controls.
    pub description: String,
    /// Default value; a parameter without one is required.
    pub default: Option<f64>,
}

impl TemplateParameter {
    /// Creates a required parameter.
    #[must_use]
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            default: None,
        }
    }

    /// Creates an optional parameter with a default value.
    #[must_use]
    pub fn with_default(
        name: impl Into<String>,
        description: impl Into<String>,
        default: f64,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            default: Some(default),
        }
    }

    /// Returns true if the parameter must be supplied at instantiation.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// A condition threshold: fixed, or resolved from a named parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdSpec {
    /// A fixed threshold value.
    Fixed(f64),
    /// A threshold resolved from a declared parameter.
    Param(String),
}

/// A condition blueprint inside a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionTemplate {
    /// The signal this condition applies to.
    #[serde(rename = "data_type")]
    pub kind: BiometricKind,
    /// The comparison operator.
    pub operator: ComparisonOperator,
    /// Fixed or parameterized threshold.
    pub threshold: ThresholdSpec,
    /// Optional evaluation window in hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window_hours: Option<u32>,
    /// Window aggregation strategy.
    #[serde(default)]
    pub aggregation: Aggregation,
}

impl ConditionTemplate {
    /// Creates a condition blueprint.
    #[must_use]
    pub const fn new(kind: BiometricKind, operator: ComparisonOperator, threshold: ThresholdSpec) -> Self {
        Self {
            kind,
            operator,
            threshold,
            time_window_hours: None,
            aggregation: Aggregation::Latest,
        }
    }

    /// Sets the evaluation window in hours.
    #[must_use]
    pub const fn with_window_hours(mut self, hours: u32) -> Self {
        self.time_window_hours = Some(hours);
        self
    }

    /// Sets the window aggregation strategy.
    #[must_use]
    pub const fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    fn resolve(&self, params: &HashMap<String, f64>) -> Result<RuleCondition> {
        let threshold = match &self.threshold {
            ThresholdSpec::Fixed(value) => *value,
            ThresholdSpec::Param(name) => {
                *params
                    .get(name)
                    .ok_or_else(|| RuleError::MissingParameter { name: name.clone() })?
            }
        };

        let mut condition = RuleCondition::new(self.kind, self.operator, threshold)?;
        condition.time_window_hours = self.time_window_hours;
        condition.aggregation = self.aggregation;
        Ok(condition)
    }
}

/// A parameterized rule blueprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTemplate {
    /// Unique identifier for the template.
    pub id: TemplateId,
    /// Human-readable name, copied to instantiated rules.
    pub name: String,
    /// Clinical description, copied to instantiated rules.
    pub description: String,
    /// Declared parameter schema.
    pub parameters: Vec<TemplateParameter>,
    /// Condition blueprints.
    pub conditions: Vec<ConditionTemplate>,
    /// Logical operator for instantiated rules.
    pub logical_operator: LogicalOperator,
    /// Priority of alerts raised by instantiated rules.
    #[serde(rename = "alert_priority")]
    pub priority: AlertPriority,
}

impl RuleTemplate {
    /// Creates a new template.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: TemplateId::new(),
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            conditions: Vec::new(),
            logical_operator: LogicalOperator::And,
            priority: AlertPriority::Warning,
        }
    }

    /// Declares a parameter.
    #[must_use]
    pub fn parameter(mut self, parameter: TemplateParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Appends a condition blueprint.
    #[must_use]
    pub fn condition(mut self, condition: ConditionTemplate) -> Self {
        self.conditions.push(condition);
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

    /// Instantiates the template into a concrete, patient-bound rule.
    ///
    /// The declared schema is validated first: every required parameter must
    /// be present in `params`, and defaults fill in absent optional ones.
    /// Only then are condition thresholds substituted.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::MissingParameter` naming the first absent
    /// required parameter (or a threshold referencing an undeclared one),
    /// and `RuleError::InvalidRule` if the template has no conditions.
    pub fn instantiate(
        &self,
        patient_id: PatientId,
        provider_id: ProviderId,
        params: &HashMap<String, f64>,
    ) -> Result<BiometricRule> {
        let mut resolved: HashMap<String, f64> = HashMap::new();
        for parameter in &self.parameters {
            match params.get(&parameter.name).copied().or(parameter.default) {
                Some(value) => {
                    resolved.insert(parameter.name.clone(), value);
                }
                None => {
                    return Err(RuleError::MissingParameter {
                        name: parameter.name.clone(),
                    });
                }
            }
        }

        let conditions = self
            .conditions
            .iter()
            .map(|c| c.resolve(&resolved))
            .collect::<Result<Vec<_>>>()?;

        BiometricRule::builder(self.name.clone(), provider_id)
            .description(self.description.clone())
            .conditions(conditions)
            .logical_operator(self.logical_operator)
            .priority(self.priority)
            .patient(patient_id)
            .build()
    }
}
