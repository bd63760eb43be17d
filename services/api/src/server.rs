use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemorySnapshotStore};
use crate::routes::scorecard_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use site_scorecard::config::AppConfig;
use site_scorecard::error::AppError;
use site_scorecard::scorecard::{JsonSnapshotSource, ScorecardEngine, SnapshotSource, SourceSnapshot};
use site_scorecard::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
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
    let readiness_flag = Arc::new(AtomicBool::new(false));

    let engine = Arc::new(ScorecardEngine::canonical()?);
    let seed = match &config.scorecard.snapshot_path {
        Some(path) => {
            let snapshot = JsonSnapshotSource::new(path).load()?;
            info!(
                path = %path.display(),
                sites = snapshot.site_ids().len(),
                weekly_reports = snapshot.weekly_reports.len(),
                "seed snapshot loaded"
            );
            snapshot
        }
        None => SourceSnapshot::default(),
    };

    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        engine: Arc::clone(&engine),
        store: Arc::new(InMemorySnapshotStore::seeded(seed)),
    };

    let app = scorecard_routes()
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        catalog_version = engine.catalog().version(),
        "site scorecard service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
