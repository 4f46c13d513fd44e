use crate::cli::ServeArgs;
use crate::config::AppConfig;
use crate::decisioning::{
    CounterOutcomeMetrics, DecisionService, EngineConfig, EvaluationEngine, SpawnedRecorder,
};
use crate::error::AppError;
use crate::infra::{
    AppState, AttributeEqualsPredicate, InMemoryEnrichmentGateway, InMemoryFamilyDirectory,
    InMemoryListStore, InMemoryRecordStore, InMemoryRuleStore,
};
use crate::routes::with_decision_routes;
use crate::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let records = Arc::new(InMemoryRecordStore::default());
    let engine = EvaluationEngine::new(
        EngineConfig {
            merchant_scores_enabled: config.scoring.merchant_scores_enabled,
        },
        Arc::new(InMemoryListStore::default()),
        Arc::new(InMemoryRuleStore::default()),
        Arc::new(InMemoryFamilyDirectory::default()),
        Arc::new(AttributeEqualsPredicate),
        Arc::new(InMemoryEnrichmentGateway::default()),
    );
    let recorder = Arc::new(SpawnedRecorder::new(
        records.clone(),
        Arc::new(CounterOutcomeMetrics),
    ));
    let service = Arc::new(DecisionService::new(engine, records, recorder));

    let app = with_decision_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "fraud decisioning service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
