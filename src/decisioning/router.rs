use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::domain::{Charge, EvaluationId};
use super::recorder::OutcomeRecorder;
use super::repository::{RecordStore, RecordStoreError};
use super::service::{DecisionService, DecisionServiceError};

/// Router builder exposing the evaluation and record-lookup endpoints.
pub fn decision_router<R, Rec>(service: Arc<DecisionService<R, Rec>>) -> Router
where
    R: RecordStore + 'static,
    Rec: OutcomeRecorder + 'static,
{
    Router::new()
        .route("/api/v1/charges/evaluate", post(evaluate_handler::<R, Rec>))
        .route(
            "/api/v1/charges/evaluate-rules",
            post(evaluate_rules_handler::<R, Rec>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id",
            get(record_handler::<R, Rec>),
        )
        .with_state(service)
}

pub(crate) async fn evaluate_handler<R, Rec>(
    State(service): State<Arc<DecisionService<R, Rec>>>,
    axum::Json(charge): axum::Json<Charge>,
) -> Response
where
    R: RecordStore + 'static,
    Rec: OutcomeRecorder + 'static,
{
    evaluation_response(service.evaluate_full(charge))
}

pub(crate) async fn evaluate_rules_handler<R, Rec>(
    State(service): State<Arc<DecisionService<R, Rec>>>,
    axum::Json(charge): axum::Json<Charge>,
) -> Response
where
    R: RecordStore + 'static,
    Rec: OutcomeRecorder + 'static,
{
    evaluation_response(service.evaluate_rules_only(charge))
}

pub(crate) async fn record_handler<R, Rec>(
    State(service): State<Arc<DecisionService<R, Rec>>>,
    Path(evaluation_id): Path<String>,
) -> Response
where
    R: RecordStore + 'static,
    Rec: OutcomeRecorder + 'static,
{
    let id = EvaluationId(evaluation_id);
    match service.get_record(&id) {
        Ok(record) => (StatusCode::OK, axum::Json(record.response_view())).into_response(),
        Err(DecisionServiceError::Records(RecordStoreError::NotFound)) => {
            let payload = json!({
                "evaluation_id": id.0,
                "error": "evaluation not found",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

fn evaluation_response(
    result: Result<super::repository::EvaluationRecord, DecisionServiceError>,
) -> Response {
    match result {
        Ok(record) => (StatusCode::OK, axum::Json(record.response_view())).into_response(),
        Err(DecisionServiceError::Console(error)) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
