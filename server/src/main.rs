//! Stockroom Server - Main Entry Point

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use stockroom_server::{api, auth::JwtIdentityProvider, config, db, permissions::PgAccessStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stockroom_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        inventory_read_implies_create = config.inventory_read_implies_create,
        "Starting Stockroom Server"
    );

    // Initialize database
    let db_pool = db::create_pool(&config.database_url).await?;
    if config.run_migrations {
        db::run_migrations(&db_pool).await?;
    }

    // One store and one identity provider for the whole process
    let store = Arc::new(PgAccessStore::new(db_pool));
    let identity = Arc::new(JwtIdentityProvider::new(
        &config.jwt_secret,
        config.jwt_audience.as_deref(),
    ));

    let state = api::AppState::new(config.clone(), identity, store);
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await?;

    info!("Server shutdown complete");

    Ok(())
}
