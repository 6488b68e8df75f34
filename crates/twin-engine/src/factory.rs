//! Builds alerts from matched rules.

use twin_alerts::BiometricAlert;
use twin_biometrics::PatientId;
use twin_rules::BiometricRule;

use crate::evaluator::RuleMatch;

/// Renders matched rules into alerts.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlertFactory;

impl AlertFactory {
    /// Creates a factory.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Builds a NEW alert for a rule that matched.
    ///
    /// The description combines the rule's own description with a
    /// rendering of each matched condition and its observed value, e.g.
    /// `heart_rate >= 120 (observed 125)`.
    #[must_use]
    pub fn create(
        &self,
        rule: &BiometricRule,
        patient_id: PatientId,
        outcome: &RuleMatch,
    ) -> BiometricAlert {
        let mut description = if rule.description.is_empty() {
            format!("Rule '{}' matched", rule.name)
        } else {
            rule.description.clone()
        };

        let rendered: Vec<String> = outcome
            .conditions
            .iter()
            .filter(|c| c.matched)
            .map(|c| match c.observed {
                Some(observed) => format!("{} (observed {observed})", c.summary),
                None => c.summary.clone(),
            })
            .collect();
        if !rendered.is_empty() {
            description.push_str(": ");
            description.push_str(&rendered.join("; "));
        }

        BiometricAlert::new(
            patient_id,
            rule.id,
            rule.name.clone(),
            description,
            rule.priority,
            outcome.triggering_points.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::ConditionOutcome;
    use twin_alerts::AlertStatus;
    use twin_rules::{
        AlertPriority, BiometricRule, ComparisonOperator, ProviderId, RuleCondition,
    };
    use twin_biometrics::BiometricKind;

    fn matched_outcome(summary: &str, observed: f64) -> RuleMatch {
        RuleMatch {
            matched: true,
            conditions: vec![ConditionOutcome {
                summary: summary.to_string(),
                evaluated: true,
                matched: true,
                observed: Some(observed),
            }],
            triggering_points: Vec::new(),
        }
    }

    fn tachycardia_rule(patient: PatientId) -> BiometricRule {
        BiometricRule::builder("Tachycardia", ProviderId::new())
            .description("Sustained elevated heart rate")
            .condition(
                RuleCondition::new(
                    BiometricKind::HeartRate,
                    ComparisonOperator::GreaterThanOrEqual,
                    120.0,
                )
                .unwrap(),
            )
            .priority(AlertPriority::Urgent)
            .patient(patient)
            .build()
            .unwrap()
    }

    #[test]
    fn alert_carries_rule_identity_and_priority() {
        let patient = PatientId::new();
        let rule = tachycardia_rule(patient);
        let outcome = matched_outcome("heart_rate >= 120", 125.0);

        let alert = AlertFactory::new().create(&rule, patient, &outcome);

        assert_eq!(alert.patient_id, patient);
        assert_eq!(alert.rule_id, rule.id);
        assert_eq!(alert.alert_type, "Tachycardia");
        assert_eq!(alert.priority, AlertPriority::Urgent);
        assert_eq!(alert.status, AlertStatus::New);
    }

    #[test]
    fn description_renders_observed_values() {
        let patient = PatientId::new();
        let rule = tachycardia_rule(patient);
        let outcome = matched_outcome("heart_rate >= 120", 125.0);

        let alert = AlertFactory::new().create(&rule, patient, &outcome);

        assert_eq!(
            alert.description,
            "Sustained elevated heart rate: heart_rate >= 120 (observed 125)"
        );
    }

    #[test]
    fn skipped_conditions_are_not_rendered() {
        let patient = PatientId::new();
        let rule = tachycardia_rule(patient);
        let outcome = RuleMatch {
            matched: true,
            conditions: vec![
                ConditionOutcome {
                    summary: "heart_rate > 120".to_string(),
                    evaluated: true,
                    matched: true,
                    observed: Some(130.0),
                },
                ConditionOutcome {
                    summary: "heart_rate < 40".to_string(),
                    evaluated: false,
                    matched: false,
                    observed: None,
                },
            ],
            triggering_points: Vec::new(),
        };

        let alert = AlertFactory::new().create(&rule, patient, &outcome);
        assert!(alert.description.contains("heart_rate > 120"));
        assert!(!alert.description.contains("heart_rate < 40"));
    }
}
