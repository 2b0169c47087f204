pub mod api;
pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::api::{AppState, app_router};
use crate::core::config::{AppConfig, ProviderConfig};
use crate::core::{CurrencyCatalog, RateResolver};
use crate::providers::CbrProvider;
use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Builds the HTTP application: catalog, cache, provider and routes.
pub fn build_app(config: &AppConfig) -> Result<Router> {
    let catalog = Arc::new(CurrencyCatalog::load(&config.catalog_path)?);
    let cache = store::open_rate_cache(config)?;
    let provider = Arc::new(CbrProvider::from_config(&config.provider)?);
    let resolver = Arc::new(RateResolver::new(cache, provider));

    let state = Arc::new(AppState { catalog, resolver });
    app_router(state, &config.cors, request_timeout(&config.provider))
}

/// Room for every provider attempt plus the retry pauses.
fn request_timeout(provider: &ProviderConfig) -> Duration {
    let attempts = (provider.retries as u64).saturating_add(1);
    Duration::from_secs(provider.timeout_secs.saturating_mul(attempts))
        .saturating_add(Duration::from_millis(
            provider.retry_delay_ms.saturating_mul(attempts),
        ))
        .saturating_add(Duration::from_secs(1))
}

pub async fn serve(config_path: Option<&str>) -> Result<()> {
    info!("Exchange rate service starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let router = build_app(&config)?;
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!("Listening on {}", config.listen_addr);
    axum::serve(listener, router)
        .await
        .context("HTTP server failed")?;
    Ok(())
}
