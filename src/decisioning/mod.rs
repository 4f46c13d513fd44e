//! Charge decisioning: ordered console evaluation over static lists,
//! tiered rule sets, and external risk signals.
//!
//! The engine walks a charge's configured console one component at a time,
//! resolving a production decision and a parallel shadow decision, and hands
//! the finished record to a detached outcome recorder. Every external
//! dependency — list and rule fetches, family resolution, the opaque rule
//! predicate, enrichment lookups, record storage, metrics — is a trait seam
//! defined in [`repository`].

pub(crate) mod context;
pub mod domain;
pub mod engine;
pub(crate) mod lists;
pub mod recorder;
pub mod repository;
pub(crate) mod resolver;
pub mod router;
pub(crate) mod rules;
pub mod service;

#[cfg(test)]
mod tests;

pub use context::SCORE_SENTINEL;
pub use domain::{
    AttributeValue, Charge, ChargeAttributes, Component, ComponentKind, Decision, EvaluationId,
    Family, FamilyCompanies, FamilyCompaniesFilter, FamilyFilter, ListEntry, ListType,
    PayerDetails, PaymentDetails, Rule, RuleScope, SearchKey,
};
pub use engine::{EngineConfig, EvaluationEngine, EvaluationOutcome};
pub use lists::ListEvaluationResult;
pub use recorder::{CounterOutcomeMetrics, OutcomeRecorder, RecordedOutcome, SpawnedRecorder};
pub use repository::{
    EnrichmentGateway, EvaluationRecord, EvaluationView, FamilyDirectory, ListStore,
    ModuleBreakdown, OutcomeMetrics, OutcomeTags, PredicateError, RecordStore, RecordStoreError,
    RulePredicate, RuleStore, SourceError,
};
pub use router::decision_router;
pub use rules::RuleEvaluationResult;
pub use service::{ConsoleError, DecisionService, DecisionServiceError};
