//! services/api/src/bin/api.rs
//!
//! Starts the HTTP server: config, logging, store selection, then `axum::serve`
//! until Ctrl-C.

use api_lib::{
    adapters::{db::DbAdapter, memory::MemoryStore},
    auth::{AuthService, AuthSettings},
    config::{Config, StoreBackend},
    error::ApiError,
    web::{create_router, AppState},
};
use plume_core::ports::{CredentialStore, ProjectStore, SessionStore};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to the Store & Run Migrations ---
    let (users, sessions, projects): (
        Arc<dyn CredentialStore>,
        Arc<dyn SessionStore>,
        Arc<dyn ProjectStore>,
    ) = match &config.store {
        StoreBackend::Postgres { database_url } => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .min_connections(config.db_min_connections)
                .acquire_timeout(Duration::from_secs(10))
                .max_lifetime(Duration::from_secs(55 * 60))
                .idle_timeout(Duration::from_secs(5 * 60))
                .connect(database_url)
                .await?;
            let db_adapter = Arc::new(DbAdapter::new(db_pool));
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            (db_adapter.clone(), db_adapter.clone(), db_adapter)
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; all data is lost on restart.");
            let store = Arc::new(MemoryStore::new());
            (store.clone(), store.clone(), store)
        }
    };

    if config.token_max_age.is_none() {
        warn!("TOKEN_MAX_AGE_SECS=0: bearer tokens never expire while AUTH_SECRET is unchanged.");
    }
    if config.auth_secret_previous.is_some() {
        info!("Accepting bearer tokens signed with the previous AUTH_SECRET.");
    }

    // --- 3. Build the Shared AppState ---
    let auth = AuthService::new(AuthSettings::from(config.as_ref()), users, sessions)?;
    let app_state = Arc::new(AppState {
        auth: Arc::new(auth),
        projects,
        config: config.clone(),
    });

    // --- 4. Create the Web Router ---
    let app = create_router(app_state);

    // --- 5. Start the Server ---
    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down gracefully...");
        }
        on_signal.cancel();
    });

    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Server stopped cleanly.");
    Ok(())
}
