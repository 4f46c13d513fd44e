use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use metrics_exporter_prometheus::PrometheusHandle;

use crate::decisioning::{
    AttributeValue, Charge, ChargeAttributes, EnrichmentGateway, EvaluationId, EvaluationRecord,
    Family, FamilyCompanies, FamilyCompaniesFilter, FamilyDirectory, FamilyFilter, ListEntry,
    ListStore, PredicateError, RecordStore, RecordStoreError, Rule, RulePredicate, RuleScope,
    RuleStore, SearchKey, SourceError,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Static lists held in memory, keyed by the individual search-key values.
#[derive(Default)]
pub(crate) struct InMemoryListStore {
    entries: Mutex<HashMap<String, Vec<ListEntry>>>,
}

impl ListStore for InMemoryListStore {
    fn candidate_lists(&self, key: &SearchKey) -> Result<Vec<ListEntry>, SourceError> {
        let guard = self.entries.lock().expect("list store mutex poisoned");
        let mut candidates = Vec::new();
        for value in [&key.email, &key.card_hash, &key.phone, &key.company_id] {
            if let Some(entries) = guard.get(value) {
                candidates.extend(entries.iter().cloned());
            }
        }
        Ok(candidates)
    }
}

/// Rule configuration held in memory; fetch order is insertion order.
#[derive(Default)]
pub(crate) struct InMemoryRuleStore {
    rules: Mutex<Vec<Rule>>,
}

impl RuleStore for InMemoryRuleStore {
    fn candidate_rules(&self, scope: &RuleScope) -> Result<Vec<Rule>, SourceError> {
        let guard = self.rules.lock().expect("rule store mutex poisoned");
        let candidates = guard
            .iter()
            .filter(|rule| {
                let company_match = rule
                    .company_id
                    .as_ref()
                    .map(|company| company == &scope.company_id)
                    .unwrap_or(rule.is_global);
                let family_match = match (&rule.family_id, &scope.family_id) {
                    (Some(rule_family), Some(scope_family)) => rule_family == scope_family,
                    _ => false,
                };
                let group_match = rule
                    .family_company_id
                    .as_ref()
                    .map(|group| scope.family_company_ids.contains(group))
                    .unwrap_or(false);
                company_match || family_match || group_match
            })
            .cloned()
            .collect();
        Ok(candidates)
    }
}

/// Family configuration held in memory.
#[derive(Default)]
pub(crate) struct InMemoryFamilyDirectory {
    families: Mutex<Vec<Family>>,
    groups: Mutex<Vec<FamilyCompanies>>,
}

impl FamilyDirectory for InMemoryFamilyDirectory {
    fn resolve_family(&self, filter: &FamilyFilter) -> Result<Option<Family>, SourceError> {
        let guard = self.families.lock().expect("family mutex poisoned");
        Ok(guard
            .iter()
            .find(|family| filter.mccs.iter().any(|mcc| family.mccs.contains(mcc)))
            .cloned())
    }

    fn resolve_family_companies(
        &self,
        filter: &FamilyCompaniesFilter,
    ) -> Result<Vec<FamilyCompanies>, SourceError> {
        let guard = self.groups.lock().expect("family group mutex poisoned");
        Ok(guard
            .iter()
            .filter(|group| {
                filter
                    .company_ids
                    .iter()
                    .any(|company| group.company_ids.contains(company))
            })
            .cloned()
            .collect())
    }
}

/// Stand-in predicate for the opaque condition collaborator: interprets a
/// condition of the form `{"field": ..., "equals": ...}` against the
/// flattened charge attributes. Real condition evaluation lives outside
/// this service.
pub(crate) struct AttributeEqualsPredicate;

impl RulePredicate for AttributeEqualsPredicate {
    fn applies(&self, rule: &Rule, attributes: &ChargeAttributes) -> Result<bool, PredicateError> {
        let field = rule
            .condition
            .get("field")
            .and_then(|value| value.as_str())
            .ok_or_else(|| PredicateError(format!("rule {} has no condition field", rule.id)))?;
        let expected = rule
            .condition
            .get("equals")
            .ok_or_else(|| PredicateError(format!("rule {} has no expected value", rule.id)))?;

        let Some(actual) = attributes.get(field) else {
            return Ok(false);
        };

        let matched = match actual {
            AttributeValue::Text(text) => expected.as_str() == Some(text.as_str()),
            AttributeValue::Number(number) => expected.as_f64() == Some(*number),
            AttributeValue::Flag(flag) => expected.as_bool() == Some(*flag),
        };
        Ok(matched)
    }
}

/// Enrichment values held in memory; lookups default to neutral values.
#[derive(Default)]
pub(crate) struct InMemoryEnrichmentGateway {
    chargebacks: Mutex<HashMap<String, u32>>,
    risk_scores: Mutex<HashMap<String, f64>>,
    merchant_scores: Mutex<HashMap<String, f64>>,
}

impl EnrichmentGateway for InMemoryEnrichmentGateway {
    fn chargeback_count(&self, email: &str) -> Result<u32, SourceError> {
        let guard = self.chargebacks.lock().expect("chargeback mutex poisoned");
        Ok(guard.get(email).copied().unwrap_or(0))
    }

    fn risk_score(&self, charge: &Charge) -> Result<f64, SourceError> {
        let guard = self.risk_scores.lock().expect("risk score mutex poisoned");
        Ok(guard.get(&charge.payment.card_hash).copied().unwrap_or(0.0))
    }

    fn merchant_score(&self, company_id: &str) -> Result<f64, SourceError> {
        let guard = self
            .merchant_scores
            .lock()
            .expect("merchant score mutex poisoned");
        Ok(guard.get(company_id).copied().unwrap_or(0.0))
    }
}

/// Evaluation records held in memory.
#[derive(Default)]
pub(crate) struct InMemoryRecordStore {
    records: Mutex<HashMap<EvaluationId, EvaluationRecord>>,
}

impl RecordStore for InMemoryRecordStore {
    fn insert(&self, record: EvaluationRecord) -> Result<(), RecordStoreError> {
        let mut guard = self.records.lock().expect("record store mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RecordStoreError::Conflict);
        }
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &EvaluationId) -> Result<Option<EvaluationRecord>, RecordStoreError> {
        let guard = self.records.lock().expect("record store mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}
