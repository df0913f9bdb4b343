use crate::cli::ServeArgs;
use crate::infra::{load_store, AppState, InMemoryNoticePublisher};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rto_compliance::compliance::{ComplianceService, SystemClock};
use rto_compliance::config::AppConfig;
use rto_compliance::error::AppError;
use rto_compliance::telemetry;
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
    if let Some(dir) = args.snapshot_dir.take() {
        config.snapshot_dir = Some(dir);
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = load_store(config.snapshot_dir.as_deref())?;
    let service = Arc::new(ComplianceService::new(
        Arc::new(store),
        Arc::new(InMemoryNoticePublisher::default()),
        Arc::new(SystemClock),
        config.engine.clone(),
    ));

    let app = with_service_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "rto compliance service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
