use std::sync::Arc;

use metrics::counter;
use tracing::error;

use super::repository::{EvaluationRecord, OutcomeMetrics, OutcomeTags, RecordStore};

/// Everything the detached recording path needs: the finished record plus
/// the metric labels snapshot.
#[derive(Debug, Clone)]
pub struct RecordedOutcome {
    pub record: EvaluationRecord,
    pub tags: OutcomeTags,
}

impl RecordedOutcome {
    /// Did the shadow track disagree with production?
    pub fn decision_changed(&self) -> bool {
        self.record.decision != self.record.test_decision
    }
}

/// Seam for outcome recording. The request path calls `record` after the
/// caller-visible result is finalized and never observes the outcome;
/// implementations own the detachment.
pub trait OutcomeRecorder: Send + Sync {
    fn record(&self, outcome: RecordedOutcome);
}

/// Production recorder: detaches onto the runtime, emits the
/// decision-change metric, persists the record. Failures are logged and
/// swallowed; nothing flows back to the request path.
pub struct SpawnedRecorder<R> {
    records: Arc<R>,
    metrics: Arc<dyn OutcomeMetrics>,
}

impl<R> SpawnedRecorder<R> {
    pub fn new(records: Arc<R>, metrics: Arc<dyn OutcomeMetrics>) -> Self {
        Self { records, metrics }
    }
}

impl<R> OutcomeRecorder for SpawnedRecorder<R>
where
    R: RecordStore + 'static,
{
    fn record(&self, outcome: RecordedOutcome) {
        let records = Arc::clone(&self.records);
        let metrics = Arc::clone(&self.metrics);
        tokio::spawn(async move {
            metrics.decision_changed(&outcome.tags, outcome.decision_changed());
            let id = outcome.record.id.clone();
            if let Err(err) = records.insert(outcome.record) {
                error!(evaluation = %id.0, error = %err, "failed to persist evaluation record");
            }
        });
    }
}

/// Decision-change counter emitted through the process metrics recorder,
/// rendered by the Prometheus exporter at `/metrics`.
pub struct CounterOutcomeMetrics;

impl OutcomeMetrics for CounterOutcomeMetrics {
    fn decision_changed(&self, tags: &OutcomeTags, changed: bool) {
        counter!(
            "riskdesk_decision_changes_total",
            "company" => tags.company_id.clone(),
            "card_brand" => tags.card_brand.clone(),
            "card_type" => tags.card_type.clone(),
            "country" => tags.country.clone(),
            "issuer" => tags.issuer.clone(),
            "changed" => if changed { "true" } else { "false" }
        )
        .increment(1);
    }
}
