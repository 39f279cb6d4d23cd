//! Firewall log REST API: upload CSV exports, query stored entries.

use fwlog_api::config::AppConfig;
use fwlog_api::server::{self, AppState};
use fwlog_ingest::IngestionService;
use fwlog_store::{InMemoryLogStore, SqliteLogStore};
use fwlog_types::LogStore;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let geo = config.geoip.open();
    let store: Arc<dyn LogStore + Send + Sync> = match &config.database_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "using SQLite log store");
            Arc::new(SqliteLogStore::new(path)?)
        }
        None => {
            tracing::warn!("FWLOG_DATABASE not set; log entries are kept in memory only");
            Arc::new(InMemoryLogStore::new())
        }
    };

    let state = Arc::new(AppState {
        ingestion: Arc::new(IngestionService::new(geo)),
        store,
        max_upload_bytes: config.max_upload_bytes,
    });
    let app = server::router(state);
    tracing::info!("Firewall log API listening on {}", config.listen);
    axum::serve(
        tokio::net::TcpListener::bind(config.listen).await?,
        app.into_make_service(),
    )
    .await?;
    Ok(())
}
