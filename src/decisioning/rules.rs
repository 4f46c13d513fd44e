use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::domain::{
    Charge, ChargeAttributes, Component, ComponentKind, Decision, FamilyCompaniesFilter,
    FamilyFilter, Rule, RuleScope,
};
use super::repository::{FamilyDirectory, RulePredicate, RuleStore};

/// Outcome of running one rule-like component. Applied rules are split into
/// production and shadow buckets; predicate and fetch failures are recorded
/// without aborting the batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleEvaluationResult {
    pub decision: Decision,
    pub test_decision: Decision,
    pub applied: Vec<Rule>,
    pub test_applied: Vec<Rule>,
    pub global_evaluated: u32,
    pub specific_evaluated: u32,
    pub errors: Vec<String>,
}

/// Runs the opaque predicate over a component's candidate rules and folds
/// the applying rules into a primary and optional secondary decision.
pub(crate) struct RuleEvaluator {
    rules: Arc<dyn RuleStore>,
    families: Arc<dyn FamilyDirectory>,
    predicate: Arc<dyn RulePredicate>,
}

impl RuleEvaluator {
    pub(crate) fn new(
        rules: Arc<dyn RuleStore>,
        families: Arc<dyn FamilyDirectory>,
        predicate: Arc<dyn RulePredicate>,
    ) -> Self {
        Self {
            rules,
            families,
            predicate,
        }
    }

    pub(crate) fn evaluate(
        &self,
        component: &Component,
        charge: &Charge,
        attributes: &ChargeAttributes,
    ) -> RuleEvaluationResult {
        let mut result = RuleEvaluationResult::default();

        let scope = match self.resolve_scope(component.kind, charge) {
            Ok(scope) => scope,
            Err(message) => {
                result.errors.push(message);
                return result;
            }
        };

        let candidates = match self.rules.candidate_rules(&scope) {
            Ok(candidates) => candidates,
            Err(err) => {
                result
                    .errors
                    .push(format!("{} rule fetch failed: {err}", component.kind.label()));
                return result;
            }
        };

        let primary = component.primary();
        for rule in &candidates {
            match self.predicate.applies(rule, attributes) {
                Ok(true) => {
                    if rule.is_global {
                        result.global_evaluated += 1;
                    } else {
                        result.specific_evaluated += 1;
                    }
                    if rule.is_test {
                        result.test_applied.push(rule.clone());
                        if rule.decision == primary {
                            // last matching rule in fetch order wins
                            result.test_decision = rule.decision;
                        }
                    } else {
                        result.applied.push(rule.clone());
                        if rule.decision == primary {
                            result.decision = rule.decision;
                        }
                    }
                }
                Ok(false) => {}
                Err(err) => {
                    result.errors.push(format!("rule {}: {err}", rule.id));
                }
            }
        }

        if let Some(secondary) = component.secondary() {
            // A production decision still undecided takes the secondary,
            // even when zero candidates were fetched.
            let applied_without_primary = !result.applied.is_empty()
                && !candidates.is_empty()
                && result.decision != primary;
            if applied_without_primary || result.decision.is_undecided() {
                result.decision = secondary;
            }
        }

        result
    }

    fn resolve_scope(&self, kind: ComponentKind, charge: &Charge) -> Result<RuleScope, String> {
        let mut scope = RuleScope::company(kind, &charge.company_id);

        match kind {
            ComponentKind::FamilyCompanyRules => {
                let filter = FamilyFilter {
                    mccs: vec![charge.mcc.clone()],
                    excluded_companies: vec![charge.company_id.clone()],
                };
                let family = self
                    .families
                    .resolve_family(&filter)
                    .map_err(|err| format!("family resolution failed: {err}"))?;
                scope.family_id = family.map(|family| family.id);
            }
            ComponentKind::FamilyMccRules => {
                let filter = FamilyCompaniesFilter {
                    company_ids: vec![charge.company_id.clone()],
                };
                let groups = self
                    .families
                    .resolve_family_companies(&filter)
                    .map_err(|err| format!("family-company resolution failed: {err}"))?;
                scope.family_company_ids = groups.into_iter().map(|group| group.id).collect();
            }
            _ => {}
        }

        Ok(scope)
    }
}
