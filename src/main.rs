mod common;
mod config;
mod external;
mod inspections;
mod instruments;
mod photos;
mod reports;
mod routes;
mod users;

use crate::common::state::AppState;
use crate::config::Config;
use anyhow::Context;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Set up tracing/logging
    tracing_subscriber::fmt::init();
    tracing::info!("Starting server...");

    // Load configuration and environment variables to pass to the application
    let config: Config = Config::from_env()?;

    let db_url = config.db_url.as_deref().context("DB_URL could not be built")?;
    let db: DatabaseConnection = Database::connect(db_url)
        .await
        .context("Could not connect to the database")?;

    if db.ping().await.is_ok() {
        tracing::info!("Connected to the database");
    } else {
        tracing::warn!("Could not ping the database");
    }

    Migrator::up(&db, None)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("DB migrations complete");

    users::services::ensure_admin(&db, &config).await?;

    let media = external::storage::build_media_store(&config).await;
    let state = AppState::new(db, config, media);

    tracing::info!(
        "Starting server {} ({} deployment) ...",
        state.config.app_name,
        state.config.deployment.to_uppercase()
    );

    let addr: std::net::SocketAddr = "0.0.0.0:3000".parse()?;
    tracing::info!("Listening on {addr}");

    let router = routes::build_router(&state);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router.into_make_service())
        .await
        .context("Server error")?;
    Ok(())
}
