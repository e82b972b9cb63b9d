use crate::cli::ServeArgs;
use crate::infra::{seed_catalog, AppState, ConfiguredStore, TracingActivitySink};
use crate::routes::with_credit_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use green_credits::config::AppConfig;
use green_credits::engine::{CreditsError, GreenCreditsService};
use green_credits::error::AppError;
use green_credits::telemetry;
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
    if let Some(data_dir) = args.data_dir.take() {
        config.storage.data_dir = Some(data_dir);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = ConfiguredStore::open(config.storage.data_dir.as_deref())
        .map_err(CreditsError::from)?;
    let activity = Arc::new(TracingActivitySink);
    let service = GreenCreditsService::open(Arc::new(store), activity, config.engine)?;
    seed_catalog(&service)?;

    let app = with_credit_routes(Arc::new(service))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "green credits service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
