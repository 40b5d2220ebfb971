use crate::cli::ServeArgs;
use crate::infra::{build_service, AppState};
use crate::routes::with_form_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use opsforms::config::AppConfig;
use opsforms::error::AppError;
use opsforms::telemetry;
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

    let service = Arc::new(build_service(&config).await?);
    if config.mail.to.is_empty() {
        tracing::warn!("OPSFORMS_MAIL_TO is empty; submissions will not be e-mailed");
    }

    let backend = service.store_backend();
    let transport = service.mail_transport();
    let output_dir = service.output_dir().display().to_string();

    let app = with_form_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        backend,
        transport,
        output_dir = %output_dir,
        "operator forms service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
