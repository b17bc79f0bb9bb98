use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemorySessionRepository};
use crate::routes::with_wizard_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use subsidy_navigator::catalog::SubsidyCatalog;
use subsidy_navigator::config::AppConfig;
use subsidy_navigator::error::AppError;
use subsidy_navigator::telemetry;
use subsidy_navigator::wizard::WizardService;
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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let catalog = Arc::new(SubsidyCatalog::load(&config.catalog)?);
    info!(
        programs = catalog.programs().len(),
        questions = catalog.questions().len(),
        "subsidy catalog loaded"
    );
    let repository = Arc::new(InMemorySessionRepository::default());
    let wizard_service = Arc::new(WizardService::new(catalog, repository)?);

    let app = with_wizard_routes(wizard_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "subsidy navigator ready");

    axum::serve(listener, app).await?;
    Ok(())
}
