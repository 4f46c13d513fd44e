use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Charge, ChargeAttributes, Decision, EvaluationId, Family, FamilyCompanies,
    FamilyCompaniesFilter, FamilyFilter, ListEntry, ListType, Rule, RuleScope, SearchKey,
};
use super::lists::ListEvaluationResult;
use super::rules::RuleEvaluationResult;

/// Error raised by lookup collaborators (lists, rules, families, enrichment).
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
    #[error("malformed collaborator response: {0}")]
    Malformed(String),
}

/// Error raised when a single rule's opaque condition fails to evaluate.
#[derive(Debug, thiserror::Error)]
#[error("rule condition failed to evaluate: {0}")]
pub struct PredicateError(pub String);

/// Error enumeration for evaluation-record storage.
#[derive(Debug, thiserror::Error)]
pub enum RecordStoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// Static-list lookup, keyed once per evaluation.
pub trait ListStore: Send + Sync {
    fn candidate_lists(&self, key: &SearchKey) -> Result<Vec<ListEntry>, SourceError>;
}

/// Candidate-rule fetch for one component's scope.
///
/// The returned order is preserved by the evaluator: when several rules
/// carry the component's primary decision, the last one in this order is
/// reported as responsible in the audit trail. Implementations that need a
/// stable audit trail must return a stable order.
pub trait RuleStore: Send + Sync {
    fn candidate_rules(&self, scope: &RuleScope) -> Result<Vec<Rule>, SourceError>;
}

/// Family and family-of-companies resolution for family-scoped components.
pub trait FamilyDirectory: Send + Sync {
    fn resolve_family(&self, filter: &FamilyFilter) -> Result<Option<Family>, SourceError>;

    fn resolve_family_companies(
        &self,
        filter: &FamilyCompaniesFilter,
    ) -> Result<Vec<FamilyCompanies>, SourceError>;
}

/// Opaque rule-condition evaluation. Out of the decisioning core's scope;
/// the engine only routes its verdicts and records its failures.
pub trait RulePredicate: Send + Sync {
    fn applies(&self, rule: &Rule, attributes: &ChargeAttributes) -> Result<bool, PredicateError>;
}

/// External risk signals folded into the charge before the walk. Every call
/// is fail-open: the engine substitutes a neutral default on error.
pub trait EnrichmentGateway: Send + Sync {
    fn chargeback_count(&self, email: &str) -> Result<u32, SourceError>;

    fn risk_score(&self, charge: &Charge) -> Result<f64, SourceError>;

    fn merchant_score(&self, company_id: &str) -> Result<f64, SourceError>;
}

/// Storage abstraction for finished evaluation records.
pub trait RecordStore: Send + Sync {
    fn insert(&self, record: EvaluationRecord) -> Result<(), RecordStoreError>;
    fn fetch(&self, id: &EvaluationId) -> Result<Option<EvaluationRecord>, RecordStoreError>;
}

/// Decision-change metric sink. Best-effort; implementations must not fail
/// the caller.
pub trait OutcomeMetrics: Send + Sync {
    fn decision_changed(&self, tags: &OutcomeTags, changed: bool);
}

/// Labels attached to the decision-change metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeTags {
    pub company_id: String,
    pub card_brand: String,
    pub card_type: String,
    pub country: String,
    pub issuer: String,
}

impl OutcomeTags {
    pub fn from_charge(charge: &Charge) -> Self {
        Self {
            company_id: charge.company_id.clone(),
            card_brand: charge.payment.card_brand.clone(),
            card_type: charge.payment.card_type.clone(),
            country: charge.payment.country.clone(),
            issuer: charge.payment.issuer.clone(),
        }
    }
}

/// Per-module audit buckets exposed on the evaluation record. Each list slot
/// holds the last evaluated result of that type; the rules slot holds the
/// last resolved rule component. Components never reached leave their slots
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleBreakdown {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<ListEvaluationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blacklist: Option<ListEvaluationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graylist: Option<ListEvaluationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<RuleEvaluationResult>,
}

impl ModuleBreakdown {
    pub(crate) fn put_list(&mut self, result: ListEvaluationResult) {
        match result.list_type {
            ListType::White => self.whitelist = Some(result),
            ListType::Black => self.blacklist = Some(result),
            ListType::Gray => self.graylist = Some(result),
        }
    }
}

/// The final artifact: persisted by the outcome recorder and returned to the
/// caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub id: EvaluationId,
    pub decision: Decision,
    pub test_decision: Decision,
    pub graylisted: bool,
    pub chargeback_count: u32,
    pub risk_score: f64,
    pub merchant_score: f64,
    pub charge: Charge,
    pub modules: ModuleBreakdown,
    pub created_at: DateTime<Utc>,
}

impl EvaluationRecord {
    /// Sanitized representation for API responses.
    pub fn response_view(&self) -> EvaluationView {
        EvaluationView {
            evaluation_id: self.id.clone(),
            decision: self.decision.label(),
            test_decision: self.test_decision.label(),
            graylisted: self.graylisted,
            modules: self.modules.clone(),
            created_at: self.created_at,
        }
    }
}

/// Caller-visible view of a finished evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationView {
    pub evaluation_id: EvaluationId,
    pub decision: &'static str,
    pub test_decision: &'static str,
    pub graylisted: bool,
    pub modules: ModuleBreakdown,
    pub created_at: DateTime<Utc>,
}
