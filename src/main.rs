use std::sync::Arc;

use anyhow::Context;
use eventboard::{app, config::Config, service::Database, store::SqliteStore, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,eventboard=debug")))
        .init();

    let config = Config::from_env()?;
    let store = SqliteStore::connect(&config.database_url)
        .await
        .with_context(|| format!("opening {}", config.database_url))?;
    let db = Database::new(Arc::new(store), config.join_retries);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app(AppState { db, config })).await?;
    Ok(())
}
