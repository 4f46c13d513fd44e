use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::decisioning::domain::{
    Charge, ChargeAttributes, Component, ComponentKind, Decision, EvaluationId, Family,
    FamilyCompanies, FamilyCompaniesFilter, FamilyFilter, ListEntry, PayerDetails, PaymentDetails,
    Rule, RuleScope, SearchKey,
};
use crate::decisioning::engine::{EngineConfig, EvaluationEngine};
use crate::decisioning::recorder::{OutcomeRecorder, RecordedOutcome};
use crate::decisioning::repository::{
    EnrichmentGateway, EvaluationRecord, FamilyDirectory, ListStore, OutcomeMetrics, OutcomeTags,
    PredicateError, RecordStore, RecordStoreError, RulePredicate, RuleStore, SourceError,
};
use crate::decisioning::service::DecisionService;

pub(super) fn charge(console: Vec<Component>) -> Charge {
    Charge {
        company_id: "co-100".to_string(),
        mcc: "5812".to_string(),
        amount: 45_900,
        payment: PaymentDetails {
            card_brand: "visa".to_string(),
            card_type: "credit".to_string(),
            card_hash: "hash-4242".to_string(),
            last_four: "4242".to_string(),
            issuer: "Andes Bank".to_string(),
            country: "BR".to_string(),
        },
        payer: PayerDetails {
            email: "payer@example.com".to_string(),
            phone: "+5511988887777".to_string(),
            document: Some("123.456.789-00".to_string()),
        },
        market_segment: Some("travel".to_string()),
        console,
    }
}

pub(super) fn component(kind: ComponentKind, priority: Vec<Decision>) -> Component {
    Component::new(kind, priority)
}

pub(super) fn list_entry(id: &str, kind: &str, is_test: bool) -> ListEntry {
    ListEntry {
        id: id.to_string(),
        kind: kind.to_string(),
        is_test,
    }
}

pub(super) fn rule(id: &str, decision: Decision, is_test: bool, is_global: bool) -> Rule {
    Rule {
        id: id.to_string(),
        company_id: Some("co-100".to_string()),
        family_id: None,
        family_company_id: None,
        condition: json!({ "field": "charge.mcc", "equals": "5812" }),
        decision,
        is_global,
        is_test,
    }
}

#[derive(Default)]
pub(super) struct StaticListStore {
    pub(super) entries: Vec<ListEntry>,
    pub(super) calls: AtomicUsize,
}

impl StaticListStore {
    pub(super) fn with(entries: Vec<ListEntry>) -> Self {
        Self {
            entries,
            calls: AtomicUsize::new(0),
        }
    }
}

impl ListStore for StaticListStore {
    fn candidate_lists(&self, _key: &SearchKey) -> Result<Vec<ListEntry>, SourceError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.entries.clone())
    }
}

pub(super) struct FailingListStore;

impl ListStore for FailingListStore {
    fn candidate_lists(&self, _key: &SearchKey) -> Result<Vec<ListEntry>, SourceError> {
        Err(SourceError::Unavailable("list service offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct CountingRuleStore {
    pub(super) rules: Vec<Rule>,
    pub(super) calls: AtomicUsize,
    pub(super) scopes: Mutex<Vec<RuleScope>>,
}

impl CountingRuleStore {
    pub(super) fn with(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            calls: AtomicUsize::new(0),
            scopes: Mutex::new(Vec::new()),
        }
    }
}

impl RuleStore for CountingRuleStore {
    fn candidate_rules(&self, scope: &RuleScope) -> Result<Vec<Rule>, SourceError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.scopes
            .lock()
            .expect("scope mutex poisoned")
            .push(scope.clone());
        Ok(self.rules.clone())
    }
}

pub(super) struct FailingRuleStore;

impl RuleStore for FailingRuleStore {
    fn candidate_rules(&self, _scope: &RuleScope) -> Result<Vec<Rule>, SourceError> {
        Err(SourceError::Unavailable("rule store offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct StaticFamilyDirectory {
    pub(super) family: Option<Family>,
    pub(super) groups: Vec<FamilyCompanies>,
    pub(super) family_filters: Mutex<Vec<FamilyFilter>>,
    pub(super) group_filters: Mutex<Vec<FamilyCompaniesFilter>>,
}

impl FamilyDirectory for StaticFamilyDirectory {
    fn resolve_family(&self, filter: &FamilyFilter) -> Result<Option<Family>, SourceError> {
        self.family_filters
            .lock()
            .expect("family filter mutex poisoned")
            .push(filter.clone());
        Ok(self.family.clone())
    }

    fn resolve_family_companies(
        &self,
        filter: &FamilyCompaniesFilter,
    ) -> Result<Vec<FamilyCompanies>, SourceError> {
        self.group_filters
            .lock()
            .expect("group filter mutex poisoned")
            .push(filter.clone());
        Ok(self.groups.clone())
    }
}

pub(super) struct FailingFamilyDirectory;

impl FamilyDirectory for FailingFamilyDirectory {
    fn resolve_family(&self, _filter: &FamilyFilter) -> Result<Option<Family>, SourceError> {
        Err(SourceError::Unavailable("family service offline".to_string()))
    }

    fn resolve_family_companies(
        &self,
        _filter: &FamilyCompaniesFilter,
    ) -> Result<Vec<FamilyCompanies>, SourceError> {
        Err(SourceError::Unavailable("family service offline".to_string()))
    }
}

/// Predicate fake driven by rule ids: listed ids apply, failing ids error,
/// everything else does not apply.
#[derive(Default)]
pub(super) struct SetPredicate {
    applies: HashSet<String>,
    failing: HashSet<String>,
}

impl SetPredicate {
    pub(super) fn applying(ids: &[&str]) -> Self {
        Self {
            applies: ids.iter().map(|id| id.to_string()).collect(),
            failing: HashSet::new(),
        }
    }

    pub(super) fn failing_on(mut self, ids: &[&str]) -> Self {
        self.failing = ids.iter().map(|id| id.to_string()).collect();
        self
    }
}

impl RulePredicate for SetPredicate {
    fn applies(&self, rule: &Rule, _attributes: &ChargeAttributes) -> Result<bool, PredicateError> {
        if self.failing.contains(&rule.id) {
            return Err(PredicateError("boom".to_string()));
        }
        Ok(self.applies.contains(&rule.id))
    }
}

/// Predicate fake that applies a rule only when the graylist attribute is
/// raised, used to observe sticky flag propagation.
pub(super) struct GraylistSensitivePredicate;

impl RulePredicate for GraylistSensitivePredicate {
    fn applies(&self, _rule: &Rule, attributes: &ChargeAttributes) -> Result<bool, PredicateError> {
        use crate::decisioning::domain::AttributeValue;
        Ok(matches!(
            attributes.get("charge.graylisted"),
            Some(AttributeValue::Flag(true))
        ))
    }
}

pub(super) struct StaticEnrichment {
    pub(super) chargebacks: u32,
    pub(super) risk: f64,
    pub(super) merchant: f64,
    pub(super) merchant_calls: AtomicUsize,
}

impl Default for StaticEnrichment {
    fn default() -> Self {
        Self {
            chargebacks: 0,
            risk: 0.25,
            merchant: 0.8,
            merchant_calls: AtomicUsize::new(0),
        }
    }
}

impl EnrichmentGateway for StaticEnrichment {
    fn chargeback_count(&self, _email: &str) -> Result<u32, SourceError> {
        Ok(self.chargebacks)
    }

    fn risk_score(&self, _charge: &Charge) -> Result<f64, SourceError> {
        Ok(self.risk)
    }

    fn merchant_score(&self, _company_id: &str) -> Result<f64, SourceError> {
        self.merchant_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.merchant)
    }
}

pub(super) struct FailingEnrichment;

impl EnrichmentGateway for FailingEnrichment {
    fn chargeback_count(&self, _email: &str) -> Result<u32, SourceError> {
        Err(SourceError::Unavailable("chargeback api offline".to_string()))
    }

    fn risk_score(&self, _charge: &Charge) -> Result<f64, SourceError> {
        Err(SourceError::Unavailable("risk api offline".to_string()))
    }

    fn merchant_score(&self, _company_id: &str) -> Result<f64, SourceError> {
        Err(SourceError::Unavailable("score api offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRecordStore {
    pub(super) records: Arc<Mutex<HashMap<EvaluationId, EvaluationRecord>>>,
}

impl RecordStore for MemoryRecordStore {
    fn insert(&self, record: EvaluationRecord) -> Result<(), RecordStoreError> {
        let mut guard = self.records.lock().expect("record mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RecordStoreError::Conflict);
        }
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &EvaluationId) -> Result<Option<EvaluationRecord>, RecordStoreError> {
        let guard = self.records.lock().expect("record mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

pub(super) struct UnavailableRecordStore;

impl RecordStore for UnavailableRecordStore {
    fn insert(&self, _record: EvaluationRecord) -> Result<(), RecordStoreError> {
        Err(RecordStoreError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &EvaluationId) -> Result<Option<EvaluationRecord>, RecordStoreError> {
        Err(RecordStoreError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct RecordingMetrics {
    events: Arc<Mutex<Vec<(OutcomeTags, bool)>>>,
}

impl RecordingMetrics {
    pub(super) fn events(&self) -> Vec<(OutcomeTags, bool)> {
        self.events.lock().expect("metrics mutex poisoned").clone()
    }
}

impl OutcomeMetrics for RecordingMetrics {
    fn decision_changed(&self, tags: &OutcomeTags, changed: bool) {
        self.events
            .lock()
            .expect("metrics mutex poisoned")
            .push((tags.clone(), changed));
    }
}

/// Recorder double that captures outcomes without detaching, so tests can
/// assert the recording path deterministically.
#[derive(Default, Clone)]
pub(super) struct RecordingRecorder {
    outcomes: Arc<Mutex<Vec<RecordedOutcome>>>,
}

impl RecordingRecorder {
    pub(super) fn outcomes(&self) -> Vec<RecordedOutcome> {
        self.outcomes.lock().expect("recorder mutex poisoned").clone()
    }
}

impl OutcomeRecorder for RecordingRecorder {
    fn record(&self, outcome: RecordedOutcome) {
        self.outcomes
            .lock()
            .expect("recorder mutex poisoned")
            .push(outcome);
    }
}

/// Recorder that persists and emits synchronously on the caller's thread;
/// failures are swallowed exactly as the detached recorder swallows them.
pub(super) struct InlineRecorder<R> {
    records: Arc<R>,
    metrics: RecordingMetrics,
}

impl<R> InlineRecorder<R> {
    pub(super) fn new(records: Arc<R>, metrics: RecordingMetrics) -> Self {
        Self { records, metrics }
    }
}

impl<R> OutcomeRecorder for InlineRecorder<R>
where
    R: RecordStore + 'static,
{
    fn record(&self, outcome: RecordedOutcome) {
        self.metrics
            .decision_changed(&outcome.tags, outcome.decision_changed());
        let _ = self.records.insert(outcome.record);
    }
}

pub(super) fn engine_with(
    lists: Arc<dyn ListStore>,
    rules: Arc<dyn RuleStore>,
    predicate: Arc<dyn RulePredicate>,
) -> EvaluationEngine {
    EvaluationEngine::new(
        EngineConfig::default(),
        lists,
        rules,
        Arc::new(StaticFamilyDirectory::default()),
        predicate,
        Arc::new(StaticEnrichment::default()),
    )
}

pub(super) fn build_service(
    engine: EvaluationEngine,
) -> (
    Arc<DecisionService<MemoryRecordStore, RecordingRecorder>>,
    MemoryRecordStore,
    RecordingRecorder,
) {
    let records = MemoryRecordStore::default();
    let recorder = RecordingRecorder::default();
    let service = DecisionService::new(engine, Arc::new(records.clone()), Arc::new(recorder.clone()));
    (Arc::new(service), records, recorder)
}
