//! Rule conditions: one threshold comparison over a biometric window.
//!
//! A [`RuleCondition`] is a pure predicate. The engine is responsible for
//! fetching the relevant window of points (filtered by kind and time) and
//! handing it to [`RuleCondition::evaluate`]; the condition itself never
//! touches storage.

use serde::{Deserialize, Serialize};
use tracing::warn;

use twin_biometrics::{BiometricDataPoint, BiometricKind};

use crate::error::{Result, RuleError};

/// Comparison operators for rule conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonOperator {
    /// Greater than (>).
    GreaterThan,
    /// Greater than or equal (>=).
    GreaterThanOrEqual,
    /// Less than (<).
    LessThan,
    /// Less than or equal (<=).
    LessThanOrEqual,
    /// Equal (==).
    Equal,
    /// Not equal (!=).
    NotEqual,
}

impl ComparisonOperator {
    /// Evaluates the comparison between an observed and a threshold value.
    #[must_use]
    pub fn evaluate(&self, observed: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterThan => observed > threshold,
            Self::GreaterThanOrEqual => observed >= threshold,
            Self::LessThan => observed < threshold,
            Self::LessThanOrEqual => observed <= threshold,
            Self::Equal => (observed - threshold).abs() < f64::EPSILON,
            Self::NotEqual => (observed - threshold).abs() >= f64::EPSILON,
        }
    }

    /// Returns the operator as a string symbol.
    #[must_use]
    pub const fn as_symbol(&self) -> &'static str {
        match self {
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
        }
    }
}

impl std::fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_symbol())
    }
}

/// How a time-windowed condition collapses its window to one value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// The most recent point in the window.
    #[default]
    Latest,
    /// Arithmetic mean of the window.
    Mean,
    /// Maximum of the window.
    Max,
    /// Minimum of the window.
    Min,
}

impl Aggregation {
    /// Collapses a set of values to one, or `None` if the set is empty.
    #[must_use]
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        match self {
            Self::Latest => values.last().copied(),
            Self::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
            Self::Max => values.iter().copied().reduce(f64::max),
            Self::Min => values.iter().copied().reduce(f64::min),
        }
    }

    /// Returns the aggregation as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Mean => "mean",
            Self::Max => "max",
            Self::Min => "min",
        }
    }
}

/// One atomic threshold test against a biometric signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    /// The signal this condition applies to.
    #[serde(rename = "data_type")]
    pub kind: BiometricKind,
    /// The comparison operator.
    pub operator: ComparisonOperator,
    /// The threshold value to compare against.
    #[serde(rename = "threshold_value")]
    pub threshold: f64,
    /// Optional evaluation window; absent means "latest point only".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window_hours: Option<u32>,
    /// How a windowed condition collapses its window.
    #[serde(default)]
    pub aggregation: Aggregation,
}

impl RuleCondition {
    /// Creates a new condition without a time window.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::InvalidRule` if the threshold is not finite.
    pub fn new(kind: BiometricKind, operator: ComparisonOperator, threshold: f64) -> Result<Self> {
        if !threshold.is_finite() {
            return Err(RuleError::InvalidRule {
                reason: format!("threshold for {kind} must be a finite number"),
            });
        }

        Ok(Self {
            kind,
            operator,
            threshold,
            time_window_hours: None,
            aggregation: Aggregation::default(),
        })
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

    /// Returns the aggregated observed value for the window.
    ///
    /// The window must already be filtered to this condition's kind and time
    /// range, in ascending timestamp order. Non-numeric points are excluded
    /// with a logged warning; an empty or fully non-numeric window yields
    /// `None`.
    #[must_use]
    pub fn observed(&self, window: &[BiometricDataPoint]) -> Option<f64> {
        let values: Vec<f64> = window
            .iter()
            .filter_map(|point| {
                let value = point.numeric_value();
                if value.is_none() {
                    warn!(
                        kind = %self.kind,
                        patient_id = %point.patient_id,
                        "non-numeric value cannot be compared against a threshold"
                    );
                }
                value
            })
            .collect();

        self.aggregation.apply(&values)
    }

    /// Evaluates the condition against a window of points.
    ///
    /// An empty window evaluates to `false`: a rule never fires on absence
    /// of data.
    #[must_use]
    pub fn evaluate(&self, window: &[BiometricDataPoint]) -> bool {
        self.observed(window)
            .is_some_and(|observed| self.operator.evaluate(observed, self.threshold))
    }
}

impl std::fmt::Display for RuleCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.kind, self.operator, self.threshold)?;
        if let Some(hours) = self.time_window_hours {
            write!(f, " ({} over {hours}h)", self.aggregation.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use twin_biometrics::{BiometricValue, PatientId};

    fn hr_point(value: f64) -> BiometricDataPoint {
        BiometricDataPoint::new(
            PatientId::new(),
            BiometricKind::HeartRate,
            BiometricValue::Numeric(value),
            "test",
        )
    }

    fn mood_point(label: &str) -> BiometricDataPoint {
        BiometricDataPoint::new(
            PatientId::new(),
            BiometricKind::Mood,
            BiometricValue::Text(label.to_string()),
            "test",
        )
    }

    mod operator_tests {
        use super::*;
        use test_case::test_case;

        #[test_case(ComparisonOperator::GreaterThan, 10.0, 5.0, true)]
        #[test_case(ComparisonOperator::GreaterThan, 5.0, 5.0, false)]
        #[test_case(ComparisonOperator::GreaterThanOrEqual, 100.0, 100.0, true)]
        #[test_case(ComparisonOperator::GreaterThanOrEqual, 99.999, 100.0, false)]
        #[test_case(ComparisonOperator::LessThan, 5.0, 10.0, true)]
        #[test_case(ComparisonOperator::LessThan, 10.0, 10.0, false)]
        #[test_case(ComparisonOperator::LessThanOrEqual, 10.0, 10.0, true)]
        #[test_case(ComparisonOperator::LessThanOrEqual, 10.1, 10.0, false)]
        #[test_case(ComparisonOperator::Equal, 5.0, 5.0, true)]
        #[test_case(ComparisonOperator::Equal, 5.1, 5.0, false)]
        #[test_case(ComparisonOperator::NotEqual, 5.1, 5.0, true)]
        #[test_case(ComparisonOperator::NotEqual, 5.0, 5.0, false)]
        fn operator_boundaries(
            op: ComparisonOperator,
            observed: f64,
            threshold: f64,
            expected: bool,
        ) {
            assert_eq!(op.evaluate(observed, threshold), expected);
        }

        #[test]
        fn operator_symbols() {
            assert_eq!(ComparisonOperator::GreaterThanOrEqual.as_symbol(), ">=");
            assert_eq!(ComparisonOperator::NotEqual.as_symbol(), "!=");
        }

        #[test]
        fn operator_wire_names() {
            let json = serde_json::to_string(&ComparisonOperator::GreaterThanOrEqual).unwrap();
            assert_eq!(json, "\"GREATER_THAN_OR_EQUAL\"");

            let parsed: ComparisonOperator = serde_json::from_str("\"NOT_EQUAL\"").unwrap();
            assert_eq!(parsed, ComparisonOperator::NotEqual);
        }
    }

    mod aggregation_tests {
        use super::*;

        #[test]
        fn aggregation_empty_is_none() {
            for agg in [
                Aggregation::Latest,
                Aggregation::Mean,
                Aggregation::Max,
                Aggregation::Min,
            ] {
                assert_eq!(agg.apply(&[]), None);
            }
        }

        #[test]
        fn aggregation_latest_takes_last() {
            assert_eq!(Aggregation::Latest.apply(&[1.0, 2.0, 3.0]), Some(3.0));
        }

        #[test]
        fn aggregation_mean() {
            assert_eq!(Aggregation::Mean.apply(&[1.0, 2.0, 3.0]), Some(2.0));
        }

        #[test]
        fn aggregation_max_min() {
            assert_eq!(Aggregation::Max.apply(&[1.0, 3.0, 2.0]), Some(3.0));
            assert_eq!(Aggregation::Min.apply(&[3.0, 1.0, 2.0]), Some(1.0));
        }

        #[test]
        fn aggregation_default_is_latest() {
            assert_eq!(Aggregation::default(), Aggregation::Latest);
        }
    }

    mod condition_tests {
        use super::*;

        fn hr_condition(op: ComparisonOperator, threshold: f64) -> RuleCondition {
            RuleCondition::new(BiometricKind::HeartRate, op, threshold).unwrap()
        }

        #[test]
        fn non_finite_threshold_fails() {
            let result = RuleCondition::new(
                BiometricKind::HeartRate,
                ComparisonOperator::GreaterThan,
                f64::NAN,
            );
            assert!(matches!(result, Err(RuleError::InvalidRule { .. })));

            let result = RuleCondition::new(
                BiometricKind::HeartRate,
                ComparisonOperator::GreaterThan,
                f64::INFINITY,
            );
            assert!(result.is_err());
        }

        #[test]
        fn empty_window_is_false() {
            let cond = hr_condition(ComparisonOperator::GreaterThan, 0.0);
            assert!(!cond.evaluate(&[]));
        }

        #[test]
        fn latest_aggregation_ignores_older_points() {
            let cond = hr_condition(ComparisonOperator::GreaterThanOrEqual, 120.0);
            // Only the most recent point matters under the default aggregation.
            let window = [hr_point(200.0), hr_point(90.0)];
            assert!(!cond.evaluate(&window));

            let window = [hr_point(90.0), hr_point(125.0)];
            assert!(cond.evaluate(&window));
        }

        #[test]
        fn exact_threshold_matches_gte_only() {
            let window = [hr_point(100.0)];
            assert!(hr_condition(ComparisonOperator::GreaterThanOrEqual, 100.0).evaluate(&window));
            assert!(!hr_condition(ComparisonOperator::GreaterThan, 100.0).evaluate(&window));

            let just_below = [hr_point(99.999)];
            assert!(
                !hr_condition(ComparisonOperator::GreaterThanOrEqual, 100.0).evaluate(&just_below)
            );
        }

        #[test]
        fn mean_aggregation_over_window() {
            let cond = hr_condition(ComparisonOperator::GreaterThan, 100.0)
                .with_window_hours(6)
                .with_aggregation(Aggregation::Mean);

            let window = [hr_point(90.0), hr_point(100.0), hr_point(125.0)];
            assert!(cond.evaluate(&window)); // mean 105

            let window = [hr_point(90.0), hr_point(95.0)];
            assert!(!cond.evaluate(&window));
        }

        #[test]
        fn non_numeric_window_is_false() {
            let cond = RuleCondition::new(
                BiometricKind::Mood,
                ComparisonOperator::LessThan,
                3.0,
            )
            .unwrap();

            let window = [mood_point("anxious"), mood_point("flat")];
            assert!(!cond.evaluate(&window));
            assert_eq!(cond.observed(&window), None);
        }

        #[test]
        fn mixed_window_skips_non_numeric_points() {
            let cond = RuleCondition::new(
                BiometricKind::Mood,
                ComparisonOperator::LessThanOrEqual,
                2.0,
            )
            .unwrap()
            .with_window_hours(24)
            .with_aggregation(Aggregation::Min);

            let numeric_mood = BiometricDataPoint::new(
                PatientId::new(),
                BiometricKind::Mood,
                BiometricValue::Numeric(2.0),
                "test",
            );
            let window = [mood_point("flat"), numeric_mood];
            assert!(cond.evaluate(&window));
        }

        #[test]
        fn condition_display() {
            let cond = hr_condition(ComparisonOperator::GreaterThanOrEqual, 120.0);
            assert_eq!(format!("{cond}"), "heart_rate >= 120");

            let windowed = cond.with_window_hours(6).with_aggregation(Aggregation::Max);
            assert_eq!(format!("{windowed}"), "heart_rate >= 120 (max over 6h)");
        }

        #[test]
        fn condition_serialization_uses_contract_field_names() {
            let cond = hr_condition(ComparisonOperator::GreaterThanOrEqual, 120.0);
            let json = serde_json::to_value(&cond).unwrap();
            assert_eq!(json["data_type"], "heart_rate");
            assert_eq!(json["operator"], "GREATER_THAN_OR_EQUAL");
            assert_eq!(json["threshold_value"], 120.0);
            assert!(json.get("time_window_hours").is_none());
        }

        #[test]
        fn condition_serialization_roundtrip() {
            let original = hr_condition(ComparisonOperator::LessThan, 50.0)
                .with_window_hours(12)
                .with_aggregation(Aggregation::Min);

            let json = serde_json::to_string(&original).unwrap();
            let parsed: RuleCondition = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, original);
        }

        #[test]
        fn condition_deserializes_without_aggregation_field() {
            let json = r#"{
                "data_type": "heart_rate",
                "operator": "GREATER_THAN",
                "threshold_value": 120.0,
                "time_window_hours": 6
            }"#;
            let parsed: RuleCondition = serde_json::from_str(json).unwrap();
            assert_eq!(parsed.aggregation, Aggregation::Latest);
        }
    }
}
