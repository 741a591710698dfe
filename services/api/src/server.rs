use crate::cli::ServeArgs;
use crate::infra::{AppState, ConfiguredGateway, InMemorySessionRepository, LoggingMailer};
use crate::routes::with_api_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use fraud_recovery::config::AppConfig;
use fraud_recovery::error::AppError;
use fraud_recovery::telemetry;
use fraud_recovery::workflows::delivery::{DeliverySettings, DeliveryWorkflow};
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

    let gateway = ConfiguredGateway::from_config(&config)?;
    let processor = gateway.label();
    let workflow = Arc::new(DeliveryWorkflow::new(
        Arc::new(InMemorySessionRepository::default()),
        Arc::new(gateway),
        Arc::new(LoggingMailer::default()),
        DeliverySettings::from_config(&config),
    ));

    let app = with_api_routes(workflow)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        processor,
        price = %config.payment.price,
        "fraud recovery service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
