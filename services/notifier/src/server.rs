use crate::cli::ServeArgs;
use crate::infra::{build_monitor, live_channels, AppState};
use crate::routes::with_monitor_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use legis_alerts::config::AppConfig;
use legis_alerts::error::AppError;
use legis_alerts::telemetry;
use legis_alerts::workflows::monitoring::JsonFileStore;
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

    let store = Arc::new(JsonFileStore::open(&config.monitor.state_dir)?);
    let service = build_monitor(&config, store, live_channels(&config))?;

    let app = with_monitor_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "legislative monitor ready");

    axum::serve(listener, app).await?;
    Ok(())
}
