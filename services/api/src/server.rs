use crate::cli::ServeArgs;
use crate::infra::{load_catalog, seeded_store, AppState};
use crate::routes::with_rewards_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use wishlist_rewards::config::AppConfig;
use wishlist_rewards::error::AppError;
use wishlist_rewards::rewards::RewardsService;
use wishlist_rewards::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(catalog) = args.catalog.take() {
        config.rewards.badge_catalog = Some(catalog);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let catalog = load_catalog(config.rewards.badge_catalog.as_deref())?;
    let badge_count = catalog.badges().len();
    let store = Arc::new(seeded_store(catalog));
    let rewards_service = Arc::new(RewardsService::new(store, config.rewards.criteria()));

    let app = with_rewards_routes(rewards_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        badges = badge_count,
        top_wishlist_percent = config.rewards.top_wishlist_percent,
        "wishlist rewards service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
