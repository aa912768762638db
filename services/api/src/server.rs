use crate::cli::ServeArgs;
use crate::infra::{seed_demo_directory, AppState};
use crate::routes::with_leave_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use leave_planner::config::AppConfig;
use leave_planner::error::AppError;
use leave_planner::telemetry;
use leave_planner::workflows::leave::{DirectoryService, InMemoryStore, LeaveWorkflowService};
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
    if args.seed {
        config.seed.demo_data = true;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryStore::default());
    let workflow = Arc::new(LeaveWorkflowService::new(store.clone(), store.clone()));
    let directory = Arc::new(DirectoryService::new(store.clone(), store));

    if config.seed.demo_data {
        seed_demo_directory(&*directory)?;
    }

    let app = with_leave_routes(workflow, directory)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "leave planner ready");

    axum::serve(listener, app).await?;
    Ok(())
}
