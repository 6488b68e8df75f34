//! Rule evaluation against a patient's biometric history.
//!
//! The evaluator fetches each condition's window from a
//! [`BiometricSource`], evaluates the condition, and combines the results
//! with the rule's logical operator. AND stops at the first
//! non-matching condition and OR at the first match; skipped conditions
//! are still reported, flagged as not evaluated.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use twin_biometrics::{BiometricDataPoint, BiometricSource, PatientId};
use twin_rules::{BiometricRule, LogicalOperator, RuleCondition};

use crate::error::Result;

/// The outcome of evaluating a single condition.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionOutcome {
    /// Human-readable rendering of the condition.
    pub summary: String,
    /// Whether the condition was evaluated or skipped by short-circuiting.
    pub evaluated: bool,
    /// Whether the condition matched. Always `false` when skipped.
    pub matched: bool,
    /// The aggregated observed value, if the window held numeric data.
    pub observed: Option<f64>,
}

/// The outcome of evaluating a full rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    /// Whether the rule as a whole matched.
    pub matched: bool,
    /// Per-condition outcomes, in rule order.
    pub conditions: Vec<ConditionOutcome>,
    /// The data points behind the conditions that matched.
    pub triggering_points: Vec<BiometricDataPoint>,
}

/// Evaluates rules against a biometric source.
pub struct RuleEvaluator {
    source: Arc<dyn BiometricSource>,
}

impl RuleEvaluator {
    /// Creates an evaluator reading from the given source.
    #[must_use]
    pub fn new(source: Arc<dyn BiometricSource>) -> Self {
        Self { source }
    }

    /// Evaluates one rule for one patient.
    ///
    /// A condition over an empty window does not match. Conditions
    /// skipped by short-circuiting perform no source reads.
    ///
    /// # Errors
    ///
    /// Returns an error if the biometric source fails.
    pub fn evaluate(&self, rule: &BiometricRule, patient_id: PatientId) -> Result<RuleMatch> {
        let mut outcomes = Vec::with_capacity(rule.conditions.len());
        let mut triggering_points = Vec::new();
        let mut decided: Option<bool> = None;

        for condition in &rule.conditions {
            if decided.is_some() {
                outcomes.push(ConditionOutcome {
                    summary: condition.to_string(),
                    evaluated: false,
                    matched: false,
                    observed: None,
                });
                continue;
            }

            let window = self.window_for(condition, patient_id)?;
            let observed = condition.observed(&window);
            let matched = condition.evaluate(&window);

            debug!(
                rule_id = %rule.id,
                patient_id = %patient_id,
                condition = %condition,
                observed = ?observed,
                matched,
                "evaluated condition"
            );

            if matched {
                triggering_points.extend(window);
            }

            outcomes.push(ConditionOutcome {
                summary: condition.to_string(),
                evaluated: true,
                matched,
                observed,
            });

            match rule.logical_operator {
                LogicalOperator::And if !matched => decided = Some(false),
                LogicalOperator::Or if matched => decided = Some(true),
                LogicalOperator::And | LogicalOperator::Or => {}
            }
        }

        let matched = decided.unwrap_or_else(|| {
            rule.logical_operator
                .combine(outcomes.iter().map(|o| o.matched))
        });

        if !matched {
            triggering_points.clear();
        }

        Ok(RuleMatch {
            matched,
            conditions: outcomes,
            triggering_points,
        })
    }

    /// Fetches the window of points a condition looks at.
    ///
    /// Windowed conditions read everything since `now - window`;
    /// unwindowed conditions read only the latest point.
    fn window_for(
        &self,
        condition: &RuleCondition,
        patient_id: PatientId,
    ) -> Result<Vec<BiometricDataPoint>> {
        match condition.time_window_hours {
            Some(hours) => {
                let since = Utc::now() - chrono::Duration::hours(i64::from(hours));
                Ok(self.source.recent_points(patient_id, condition.kind, since)?)
            }
            None => Ok(self
                .source
                .latest_point(patient_id, condition.kind)?
                .into_iter()
                .collect()),
        }
    }
}
