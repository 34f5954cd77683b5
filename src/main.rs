use learning_platform::{
    AppState, JsonRepository, JsonStore,
    auth::ensure_admin,
    config::{AppConfig, Env},
    create_router,
    repository::RepositoryState,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initializes logging, opens the JSON store, seeds the admin
/// account if needed and serves the router.
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    // Panics on missing production secrets.
    let config = AppConfig::load();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "learning_platform=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    let store = JsonStore::new(config.data_dir.clone());
    tracing::info!(data_dir = %store.data_dir().display(), "using JSON data directory");
    let repo = Arc::new(JsonRepository::new(store)) as RepositoryState;

    if let Err(e) = ensure_admin(&repo, &config).await {
        tracing::error!(error = %e, "could not seed the admin account");
    }

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(repo, config);
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    // Connect info feeds the per-client rate limiter.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("FATAL: HTTP server terminated unexpectedly");
}
