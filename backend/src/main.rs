use backend::{config::ServiceConfig, create_router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::from_env().expect("valid service configuration");
    let state = AppState::from_config(&config).expect("build HTTP client");
    tracing::info!(
        "routing via {} ({}), geocoding via {}",
        config.osrm_url,
        config.osrm_profile,
        config.nominatim_url
    );
    tracing::info!(
        "longest route search: ≥{}× fastest, {} attempts, {}..={} waypoints",
        config.search.min_multiplier,
        config.search.max_attempts,
        config.search.waypoints.min_count,
        config.search.waypoints.max_count
    );

    let app = create_router(state);

    let addr = config.bind_addr;
    tracing::info!("starting backend on http://{addr}");
    tracing::info!("API endpoints:");
    tracing::info!("  POST /api/directions - Fastest or longest directions between two places");
    tracing::info!("  POST /api/route - Route through explicit points");
    tracing::info!("  POST /api/geocode - Resolve an address");
    axum::serve(tokio::net::TcpListener::bind(addr).await.unwrap(), app)
        .await
        .unwrap();
}
