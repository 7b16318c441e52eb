use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryAlertRepository, InMemoryNotificationGateway, OfflineMessageDrafter,
};
use crate::routes::with_matching_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use homematch::config::AppConfig;
use homematch::error::AppError;
use homematch::matching::{EvaluationConfig, MatchDispatcher, MatchEngine, MatchPipeline};
use homematch::telemetry;
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

    let alerts = Arc::new(InMemoryAlertRepository::default());
    let notifier = Arc::new(InMemoryNotificationGateway::default());
    let drafter = Arc::new(OfflineMessageDrafter::new(&config.outreach));
    let pipeline = Arc::new(MatchPipeline::new(
        MatchEngine::new(EvaluationConfig::default()),
        MatchDispatcher::new(alerts, notifier, drafter)
            .with_language(config.outreach.language.clone()),
    ));

    let app = with_matching_routes(pipeline)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "match engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}
