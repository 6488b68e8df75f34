//! Clinician-authored biometric rules for TwinWatch.
//!
//! `twin-rules` provides everything needed to define and hold the policies
//! the engine evaluates:
//!
//! - [`RuleCondition`]: one threshold comparison, optionally time-windowed
//! - [`BiometricRule`]: a flat AND/OR combination of conditions with an
//!   alert priority, built through a validating builder
//! - [`RuleTemplate`]: a parameterized rule blueprint instantiated per
//!   patient with a declared, validated parameter schema
//! - [`RuleCatalog`]: the in-memory registry of active rules and templates
//!
//! # Example
//!
//! ```rust
//! use twin_biometrics::BiometricKind;
//! use twin_rules::{
//!     AlertPriority, BiometricRule, ComparisonOperator, ProviderId, RuleCondition,
//! };
//! use twin_biometrics::PatientId;
//!
//! let condition = RuleCondition::new(
//!     BiometricKind::HeartRate,
//!     ComparisonOperator::GreaterThanOrEqual,
//!     120.0,
//! )
//! .unwrap();
//!
//! let rule = BiometricRule::builder("Sustained tachycardia", ProviderId::new())
//!     .description("Heart rate at or above 120 bpm")
//!     .condition(condition)
//!     .priority(AlertPriority::Warning)
//!     .patient(PatientId::new())
//!     .build()
//!     .unwrap();
//!
//! assert!(rule.active);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod catalog;
pub mod condition;
pub mod error;
pub mod rule;
pub mod template;

pub use catalog::{RuleCatalog, RuleRepository};
pub use condition::{Aggregation, ComparisonOperator, RuleCondition};
pub use error::{Result, RuleError};
pub use rule::{AlertPriority, BiometricRule, LogicalOperator, ProviderId, RuleBuilder, RuleId};
pub use template::{ConditionTemplate, RuleTemplate, TemplateId, TemplateParameter, ThresholdSpec};
