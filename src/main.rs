use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use client_portal_api::app::{router, AppState};
use client_portal_api::config;
use client_portal_api::database::Database;
use client_portal_api::services::LogMailer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("client_portal_api=info,tower_http=info")),
        )
        .init();

    let config = config::config().clone();
    tracing::info!("Starting Client Portal API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set outside development");
    }

    // Lazy pool: the server starts even if the database is down, /health reports it
    let db = Database::connect_lazy(&config.database)?;
    if config.database.run_migrations {
        db.migrate().await?;
    }

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let state = AppState::new(db.clone(), config, Arc::new(LogMailer));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Client Portal API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
