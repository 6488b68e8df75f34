//! The rule catalog: active rules per patient plus registered templates.
//!
//! The catalog is the read-mostly registry the engine consults on every
//! ingestion cycle. It is constructed once per process and shared by
//! reference; rules are soft-deleted (deactivated) rather than removed so
//! historical alerts keep a valid referent.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use twin_biometrics::PatientId;

use crate::error::{Result, RuleError};
use crate::rule::{BiometricRule, ProviderId, RuleId};
use crate::template::{RuleTemplate, TemplateId};

/// Read access to the active rules of a patient.
///
/// This is the lookup seam the engine evaluates through; the in-memory
/// [`RuleCatalog`] implements it, as would a database-backed repository.
pub trait RuleRepository: Send + Sync {
    /// Returns all active, patient-bound rules for the patient.
    fn active_rules_for(&self, patient_id: PatientId) -> Result<Vec<BiometricRule>>;
}

/// In-memory registry of rules and templates.
#[derive(Debug, Default)]
pub struct RuleCatalog {
    /// All rules, keyed by ID.
    rules: Arc<RwLock<HashMap<RuleId, BiometricRule>>>,
    /// Per-patient index into `rules`.
    by_patient: Arc<RwLock<HashMap<PatientId, Vec<RuleId>>>>,
    /// Registered templates, keyed by ID.
    templates: Arc<RwLock<HashMap<TemplateId, RuleTemplate>>>,
}

impl RuleCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ============ Rule Management ============

    /// Adds a new rule.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::InvalidRule` if the rule is not bound to a
    /// patient or a rule with the same ID already exists.
    pub fn add_rule(&self, rule: BiometricRule) -> Result<()> {
        let Some(patient_id) = rule.patient_id else {
            return Err(RuleError::InvalidRule {
                reason: "rule must be bound to a patient before it can be cataloged".to_string(),
            });
        };

        let mut rules = self.rules.write();
        if rules.contains_key(&rule.id) {
            return Err(RuleError::InvalidRule {
                reason: format!("rule with ID '{}' already exists", rule.id),
            });
        }

        info!(rule_id = %rule.id, rule_name = %rule.name, patient_id = %patient_id, "added rule");

        let mut by_patient = self.by_patient.write();
        by_patient.entry(patient_id).or_default().push(rule.id);
        rules.insert(rule.id, rule);

        Ok(())
    }

    /// Replaces an existing rule.
    ///
    /// The rule keeps its patient binding; `updated_at` is refreshed.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::RuleNotFound` if the rule doesn't exist.
    pub fn update_rule(&self, mut rule: BiometricRule) -> Result<()> {
        let mut rules = self.rules.write();

        let Some(existing) = rules.get(&rule.id) else {
            return Err(RuleError::RuleNotFound {
                id: rule.id.to_string(),
            });
        };

        // A rule never migrates between patients; keep the original binding.
        rule.patient_id = existing.patient_id;
        rule.updated_at = chrono::Utc::now();

        info!(rule_id = %rule.id, rule_name = %rule.name, "updated rule");
        rules.insert(rule.id, rule);

        Ok(())
    }

    /// Soft-deletes a rule by setting `active = false`.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::RuleNotFound` if the rule doesn't exist.
    pub fn deactivate_rule(&self, rule_id: RuleId) -> Result<()> {
        let mut rules = self.rules.write();

        let Some(rule) = rules.get_mut(&rule_id) else {
            return Err(RuleError::RuleNotFound {
                id: rule_id.to_string(),
            });
        };

        rule.deactivate();
        info!(rule_id = %rule_id, "deactivated rule");

        Ok(())
    }

    /// Gets a rule by ID.
    #[must_use]
    pub fn get_rule(&self, rule_id: RuleId) -> Option<BiometricRule> {
        let rules = self.rules.read();
        rules.get(&rule_id).cloned()
    }

    /// Returns all rules, active or not.
    #[must_use]
    pub fn list_rules(&self) -> Vec<BiometricRule> {
        let rules = self.rules.read();
        rules.values().cloned().collect()
    }

    /// Returns the number of cataloged rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        let rules = self.rules.read();
        rules.len()
    }

    // ============ Template Management ============

    /// Registers a template.
    pub fn register_template(&self, template: RuleTemplate) {
        let mut templates = self.templates.write();
        info!(template_id = %template.id, template_name = %template.name, "registered template");
        templates.insert(template.id, template);
    }

    /// Gets a template by ID.
    #[must_use]
    pub fn get_template(&self, template_id: TemplateId) -> Option<RuleTemplate> {
        let templates = self.templates.read();
        templates.get(&template_id).cloned()
    }

    /// Returns all registered templates.
    #[must_use]
    pub fn list_templates(&self) -> Vec<RuleTemplate> {
        let templates = self.templates.read();
        templates.values().cloned().collect()
    }

    /// Instantiates a registered template and catalogs the resulting rule.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::UnknownTemplate` if the template is not
    /// registered, and propagates parameter-validation errors from
    /// [`RuleTemplate::instantiate`].
    pub fn instantiate(
        &self,
        template_id: TemplateId,
        patient_id: PatientId,
        provider_id: ProviderId,
        params: &HashMap<String, f64>,
    ) -> Result<BiometricRule> {
        let template = self
            .get_template(template_id)
            .ok_or_else(|| RuleError::UnknownTemplate {
                id: template_id.to_string(),
            })?;

        let rule = template.instantiate(patient_id, provider_id, params)?;
        self.add_rule(rule.clone())?;

        info!(
            template_id = %template_id,
            rule_id = %rule.id,
            patient_id = %patient_id,
            "instantiated template"
        );

        Ok(rule)
    }
}

impl RuleRepository for RuleCatalog {
    fn active_rules_for(&self, patient_id: PatientId) -> Result<Vec<BiometricRule>> {
        let by_patient = self.by_patient.read();
        let Some(ids) = by_patient.get(&patient_id) else {
            return Ok(Vec::new());
        };

        let rules = self.rules.read();
        Ok(ids
            .iter()
            .filter_map(|id| rules.get(id))
            .filter(|rule| rule.active)
            .cloned()
            .collect())
    }
}

impl Clone for RuleCatalog {
    fn clone(&self) -> Self {
        Self {
            rules: Arc::clone(&self.rules),
            by_patient: Arc::clone(&self.by_patient),
            templates: Arc::clone(&self.templates),
        }
    }
}
