use crate::cli::ServeArgs;
use crate::infra::{seed_store, AppState, DEMO_PROGRAM_ID};
use crate::routes::with_focus_area_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use focus_engine::config::AppConfig;
use focus_engine::error::AppError;
use focus_engine::focus_areas::ProgramId;
use focus_engine::telemetry;
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

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let program_id = config
        .portal
        .program_id
        .clone()
        .unwrap_or_else(|| ProgramId(DEMO_PROGRAM_ID.to_string()));
    let store = Arc::new(seed_store(program_id.clone())?);

    let app = with_focus_area_routes(store)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, %program_id, "focus area portal ready");

    axum::serve(listener, app).await?;
    Ok(())
}
