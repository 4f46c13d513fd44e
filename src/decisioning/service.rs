use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;

use super::domain::{Charge, Component, ComponentKind, EvaluationId};
use super::engine::{EvaluationEngine, EvaluationOutcome};
use super::recorder::{OutcomeRecorder, RecordedOutcome};
use super::repository::{EvaluationRecord, OutcomeTags, RecordStore, RecordStoreError};

/// Service facade composing the engine, the record store, and the outcome
/// recorder. The HTTP layer talks only to this type.
pub struct DecisionService<R, Rec> {
    engine: Arc<EvaluationEngine>,
    records: Arc<R>,
    recorder: Arc<Rec>,
}

static EVALUATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_evaluation_id() -> EvaluationId {
    let id = EVALUATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EvaluationId(format!("eval-{id:06}"))
}

impl<R, Rec> DecisionService<R, Rec>
where
    R: RecordStore + 'static,
    Rec: OutcomeRecorder + 'static,
{
    pub fn new(engine: EvaluationEngine, records: Arc<R>, recorder: Arc<Rec>) -> Self {
        Self {
            engine: Arc::new(engine),
            records,
            recorder,
        }
    }

    /// Evaluate a charge against its full console: static lists plus rules.
    pub fn evaluate_full(&self, charge: Charge) -> Result<EvaluationRecord, DecisionServiceError> {
        validate_console(&charge.console)?;
        let outcome = self.engine.evaluate(&charge);
        Ok(self.finish(charge, outcome))
    }

    /// Evaluate a charge against rule components only.
    pub fn evaluate_rules_only(
        &self,
        charge: Charge,
    ) -> Result<EvaluationRecord, DecisionServiceError> {
        validate_console(&charge.console)?;
        let outcome = self.engine.evaluate_rules_only(&charge);
        Ok(self.finish(charge, outcome))
    }

    /// Fetch a previously persisted evaluation record.
    pub fn get_record(&self, id: &EvaluationId) -> Result<EvaluationRecord, DecisionServiceError> {
        let record = self
            .records
            .fetch(id)?
            .ok_or(RecordStoreError::NotFound)?;
        Ok(record)
    }

    /// Stamp identity onto the outcome and hand it to the recorder. The
    /// recorder owns persistence and metrics; its failures never reach the
    /// caller.
    fn finish(&self, charge: Charge, outcome: EvaluationOutcome) -> EvaluationRecord {
        let tags = OutcomeTags::from_charge(&charge);
        let record = EvaluationRecord {
            id: next_evaluation_id(),
            decision: outcome.decision,
            test_decision: outcome.test_decision,
            graylisted: outcome.graylisted,
            chargeback_count: outcome.chargeback_count,
            risk_score: outcome.risk_score,
            merchant_score: outcome.merchant_score,
            charge,
            modules: outcome.modules,
            created_at: Utc::now(),
        };

        self.recorder.record(RecordedOutcome {
            record: record.clone(),
            tags,
        });

        record
    }
}

/// Rejections raised before the walk starts.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("console must contain at least one component")]
    Empty,
    #[error("{} component must declare one or two priority decisions", .kind.label())]
    InvalidPriority { kind: ComponentKind },
}

fn validate_console(console: &[Component]) -> Result<(), ConsoleError> {
    if console.is_empty() {
        return Err(ConsoleError::Empty);
    }
    for component in console {
        if component.priority.is_empty() || component.priority.len() > 2 {
            return Err(ConsoleError::InvalidPriority {
                kind: component.kind,
            });
        }
    }
    Ok(())
}

/// Error raised by the decision service.
#[derive(Debug, thiserror::Error)]
pub enum DecisionServiceError {
    #[error(transparent)]
    Console(#[from] ConsoleError),
    #[error(transparent)]
    Records(#[from] RecordStoreError),
}
