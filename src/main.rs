//! Banking Link Server - Main Application Entry Point
//!
//! Personal-banking backend: users sign up and sign in through a hosted
//! identity service, link bank accounts through an account aggregator, and
//! get a payment-processor funding source for each linked account.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Identity & Documents**: Appwrite REST API (or PostgreSQL via sqlx)
//! - **Aggregator**: Plaid
//! - **Processor**: Dwolla
//! - **Authentication**: HttpOnly session cookie
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Build one HTTP client shared by every vendor adapter
//! 3. Pick the document store (running migrations for PostgreSQL)
//! 4. Build the router and start serving

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod providers;
mod routes;
mod services;
mod shareable;
mod views;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::{
    config::{Config, DocumentBackend},
    providers::{
        DocumentStore, appwrite::AppwriteClient, dwolla::DwollaClient, plaid::PlaidClient,
        postgres::PgDocumentStore,
    },
    routes::AppState,
    shareable::ShareableIds,
    views::ViewCache,
};

async fn document_store(
    config: &Config,
    appwrite: Arc<AppwriteClient>,
) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match config.document_backend {
        DocumentBackend::Appwrite => Ok(appwrite as Arc<dyn DocumentStore>),
        DocumentBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or(config::ConfigError::Missing("DATABASE_URL"))?;

            let pool = db::create_pool(database_url).await?;
            tracing::info!("Database pool created");

            db::run_migrations(&pool).await?;
            tracing::info!("Database migrations complete");

            let store: Arc<dyn DocumentStore> = Arc::new(PgDocumentStore::new(pool, config));
            Ok(store)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG, defaulting to "info"
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        document_backend = ?config.document_backend,
        plaid_env = ?config.plaid_env,
        dwolla_env = ?config.dwolla_env,
        "Configuration loaded"
    );

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;

    let appwrite = Arc::new(AppwriteClient::new(http.clone(), &config));
    let store = document_store(&config, appwrite.clone()).await?;

    let state = AppState {
        identity: appwrite,
        store,
        aggregator: Arc::new(PlaidClient::new(http.clone(), &config)),
        processor: Arc::new(DwollaClient::new(http, &config)),
        shareable_ids: ShareableIds::new(config.shareable_id_secret.as_str()),
        views: ViewCache::default(),
    };

    let app = routes::router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
