pub mod error;
pub mod rates;

use crate::core::config::CorsConfig;
use crate::core::{CurrencyCatalog, RateResolver};
use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderValue, Method, StatusCode},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Shared, read-only request context.
pub struct AppState {
    pub catalog: Arc<CurrencyCatalog>,
    pub resolver: Arc<RateResolver>,
}

// Credentials are allowed, so origins and headers are mirrored rather than `*`.
fn cors_layer(config: &CorsConfig) -> Result<CorsLayer> {
    let origin = if config.allowed_origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        let origins = config
            .allowed_origins
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .with_context(|| format!("Invalid CORS origin: {o}"))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

pub fn app_router(
    state: Arc<AppState>,
    cors: &CorsConfig,
    request_timeout: Duration,
) -> Result<Router> {
    Ok(Router::new()
        .merge(rates::router())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            request_timeout,
        ))
        .layer(cors_layer(cors)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
