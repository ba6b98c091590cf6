//! # Orgdesk API Server
//!
//! Multi-tenant project management API. Organizations are the tenant
//! boundary; every request runs against the caller's active
//! organization, resolved from the database per request.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p orgdesk-api
//! ```

use orgdesk_api::{
    app::{build_router, AppState},
    config::Config,
};
use orgdesk_shared::{
    db::{migrations, pool},
    mailer::LogMailer,
    storage::FsBlobStore,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orgdesk_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Orgdesk API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let db_config = pool::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    };
    let pool = pool::create_pool(db_config).await?;

    migrations::run_migrations(&pool).await?;

    let storage = Arc::new(FsBlobStore::new(&config.storage.root));
    let mailer = Arc::new(LogMailer);

    let bind_address = config.bind_address();
    let state = AppState::new(pool, config, storage, mailer);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
