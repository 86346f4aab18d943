use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use tailor_market::app_state::AppState;
use tailor_market::auth::profiles::{ProfileLoader, RetryPolicy};
use tailor_market::auth::session::SessionVerifier;
use tailor_market::config::AppConfig;
use tailor_market::db::{self, orders::PgOrderRepository, profiles::PgProfileRepository};
use tailor_market::routes;
use tailor_market::services::drafts::{DraftStore, MemoryDraftStore, RedisDraftStore};
use tailor_market::services::generation::ReplicateClient;
use tailor_market::services::storage::R2Client;
use tailor_market::services::tryon::{PollSettings, TryOnService, TryOnTracker, DEFAULT_RETENTION};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing tailor-market server");

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    routes::metrics::describe();

    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Initializing R2 storage client");
    let storage = R2Client::new(
        &config.r2_bucket,
        &config.r2_endpoint,
        &config.r2_access_key,
        &config.r2_secret_key,
        &config.r2_public_url,
    )
    .expect("Failed to initialize R2 client");

    let generator = ReplicateClient::new(
        &config.ai_api_url,
        config.ai_api_key.clone(),
        &config.ai_model_version,
    );
    if !generator.is_configured() {
        tracing::warn!("AI_API_KEY not set, try-on requests will be reported as unavailable");
    }

    let drafts: Arc<dyn DraftStore> = match &config.redis_url {
        Some(url) => {
            tracing::info!("Using Redis for booking drafts");
            Arc::new(RedisDraftStore::new(url).expect("Failed to initialize Redis draft store"))
        }
        None => {
            tracing::warn!("REDIS_URL not set, booking drafts are kept in memory");
            Arc::new(MemoryDraftStore::new())
        }
    };

    let poll = PollSettings::new(config.try_on_poll_interval(), config.try_on_timeout())
        .expect("Invalid try-on poll settings");
    let tracker = Arc::new(TryOnTracker::new(
        TryOnService::new(Arc::new(storage), Arc::new(generator), poll),
        DEFAULT_RETENTION,
    ));

    let profile_repo = Arc::new(PgProfileRepository::new(db_pool.clone()));
    let state = AppState {
        db: db_pool.clone(),
        sessions: Arc::new(SessionVerifier::new(&config.jwt_secret)),
        profiles: Arc::new(ProfileLoader::new(profile_repo, RetryPolicy::default())),
        orders: Arc::new(PgOrderRepository::new(db_pool)),
        drafts,
        tryon: Arc::clone(&tracker),
        max_upload_bytes: config.max_upload_bytes,
    };

    let app: Router = routes::router(state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!(addr = %config.bind_addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!(active_try_ons = tracker.len(), "Cancelling try-on polling");
    tracker.shutdown();
    tracing::info!("Shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, starting graceful shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
