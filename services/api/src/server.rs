use crate::cli::ServeArgs;
use crate::infra::{load_seed_users, AppState, InMemoryUserRepository, LogMailer};
use crate::routes::with_application_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hackathon::config::AppConfig;
use hackathon::error::AppError;
use hackathon::telemetry;
use hackathon::workflows::application::{
    ApplicationService, FileQuestionSource, LocalFileStore, QuestionSource,
};
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

    let users = match args.seed.take() {
        Some(path) => load_seed_users(&path).await?,
        None => Vec::new(),
    };
    let repository = Arc::new(InMemoryUserRepository::with_users(users));

    // Fail at boot on a broken question file; requests re-read it afterwards.
    let questions = FileQuestionSource::new(&config.event.questions_path);
    let branches = questions.load().await?;
    info!(
        path = %config.event.questions_path.display(),
        branches = branches.len(),
        "question configuration loaded"
    );

    let files = LocalFileStore::new(&config.event.upload_root);
    let application_service = Arc::new(ApplicationService::new(
        repository,
        Arc::new(LogMailer),
        Arc::new(questions),
        Arc::new(files),
        config.event.clone(),
    ));

    let app = with_application_routes(application_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, event = %config.event.event_name, "application intake ready");

    axum::serve(listener, app).await?;
    Ok(())
}
