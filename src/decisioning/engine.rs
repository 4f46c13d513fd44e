use std::sync::Arc;

use tracing::{debug, warn};

use super::context::{EvaluationContext, SCORE_SENTINEL};
use super::domain::{Charge, ComponentKind, Decision, ListEntry, ListType};
use super::lists;
use super::repository::{
    EnrichmentGateway, FamilyDirectory, ListStore, ModuleBreakdown, RulePredicate, RuleStore,
};
use super::resolver;
use super::rules::RuleEvaluator;

/// Dials for the evaluation engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Merchant reputation scores are looked up only when enabled; when
    /// disabled the sentinel value is carried instead.
    pub merchant_scores_enabled: bool,
}

/// Engine output, before the service stamps identity and persistence
/// metadata onto it.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOutcome {
    pub decision: Decision,
    pub test_decision: Decision,
    pub graylisted: bool,
    pub chargeback_count: u32,
    pub risk_score: f64,
    pub merchant_score: f64,
    pub modules: ModuleBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EvaluationMode {
    Full,
    RulesOnly,
}

/// Walks a charge's console in order, one pass, no backtracking. Owns the
/// enrichment preamble, the per-component classifier/evaluator dispatch,
/// early termination, and the audit breakdown.
pub struct EvaluationEngine {
    config: EngineConfig,
    lists: Arc<dyn ListStore>,
    enrichment: Arc<dyn EnrichmentGateway>,
    rules: RuleEvaluator,
}

impl EvaluationEngine {
    pub fn new(
        config: EngineConfig,
        lists: Arc<dyn ListStore>,
        rules: Arc<dyn RuleStore>,
        families: Arc<dyn FamilyDirectory>,
        predicate: Arc<dyn RulePredicate>,
        enrichment: Arc<dyn EnrichmentGateway>,
    ) -> Self {
        Self {
            config,
            lists,
            enrichment,
            rules: RuleEvaluator::new(rules, families, predicate),
        }
    }

    /// Full evaluation: static lists plus rule sets.
    pub fn evaluate(&self, charge: &Charge) -> EvaluationOutcome {
        self.run(charge, EvaluationMode::Full)
    }

    /// Rules-only variant: identical walk with list components skipped.
    pub fn evaluate_rules_only(&self, charge: &Charge) -> EvaluationOutcome {
        self.run(charge, EvaluationMode::RulesOnly)
    }

    fn run(&self, charge: &Charge, mode: EvaluationMode) -> EvaluationOutcome {
        let candidates = match mode {
            EvaluationMode::Full => self.fetch_candidate_lists(charge),
            EvaluationMode::RulesOnly => Vec::new(),
        };

        let mut context = self.enrich(charge);
        let mut modules = ModuleBreakdown::default();
        let mut decision = Decision::Undecided;
        let mut test_decision = Decision::Undecided;

        for component in &charge.console {
            if mode == EvaluationMode::RulesOnly && component.kind.is_list() {
                continue;
            }

            let mut list_result = None;
            let mut rule_result = None;

            if let Some(list_type) = component.kind.list_type() {
                let result = lists::classify(list_type, &candidates);
                if list_type == ListType::Gray && !result.is_empty() && !context.graylisted() {
                    context = context.with_graylist();
                }
                list_result = Some(result);
            } else {
                rule_result = Some(self.rules.evaluate(component, charge, context.attributes()));
            }

            let mut production = Vec::new();
            let mut shadow = Vec::new();
            if let Some(result) = &list_result {
                production.push(result.decision);
                shadow.push(result.test_decision);
            }
            if let Some(result) = &rule_result {
                production.push(result.decision);
                shadow.push(result.test_decision);
            }

            let resolution = resolver::resolve_track(component, &production, true);
            let shadow_resolution = resolver::resolve_track(component, &shadow, false);
            if !shadow_resolution.decision.is_undecided() {
                test_decision = shadow_resolution.decision;
            }

            let list_terminal = list_result
                .as_ref()
                .map(|result| result.terminal)
                .unwrap_or(false);

            if let Some(result) = list_result {
                modules.put_list(result);
            }
            if let Some(result) = rule_result {
                modules.rules = Some(result);
            }

            if (list_terminal || resolution.terminal) && component.kind != ComponentKind::Graylist {
                debug!(
                    component = component.kind.label(),
                    decision = resolution.decision.label(),
                    "console walk terminated"
                );
                decision = resolution.decision;
                return self.outcome(decision, test_decision, context, modules);
            }

            if !resolution.decision.is_undecided() {
                decision = resolution.decision;
            }
        }

        self.outcome(decision, test_decision, context, modules)
    }

    fn outcome(
        &self,
        decision: Decision,
        test_decision: Decision,
        context: EvaluationContext,
        modules: ModuleBreakdown,
    ) -> EvaluationOutcome {
        EvaluationOutcome {
            decision,
            test_decision,
            graylisted: context.graylisted(),
            chargeback_count: context.chargeback_count(),
            risk_score: context.risk_score(),
            merchant_score: context.merchant_score(),
            modules,
        }
    }

    /// Candidate lists are fetched once per evaluation. A lookup failure
    /// degrades to an empty candidate set rather than aborting.
    fn fetch_candidate_lists(&self, charge: &Charge) -> Vec<ListEntry> {
        match self.lists.candidate_lists(&charge.search_key()) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "list lookup failed, continuing without candidates");
                Vec::new()
            }
        }
    }

    fn enrich(&self, charge: &Charge) -> EvaluationContext {
        let chargeback_count = match self.enrichment.chargeback_count(&charge.payer.email) {
            Ok(count) => count,
            Err(err) => {
                warn!(error = %err, "chargeback lookup failed, defaulting to zero");
                0
            }
        };

        let risk_score = match self.enrichment.risk_score(charge) {
            Ok(score) => score,
            Err(err) => {
                warn!(error = %err, "risk score lookup failed, using sentinel");
                SCORE_SENTINEL
            }
        };

        let merchant_score = if self.config.merchant_scores_enabled {
            match self.enrichment.merchant_score(&charge.company_id) {
                Ok(score) => score,
                Err(err) => {
                    warn!(error = %err, "merchant score lookup failed, using sentinel");
                    SCORE_SENTINEL
                }
            }
        } else {
            SCORE_SENTINEL
        };

        EvaluationContext::new(charge, chargeback_count, risk_score, merchant_score)
    }
}
