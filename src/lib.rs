pub mod activity;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod email;
pub mod entities;
pub mod error;
pub mod extract;
pub mod form;
pub mod models;
pub mod rate_limit;
pub mod resource;
pub mod routes;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Database;
use crate::state::{AppState, SharedState};

const LIMITER_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);
const LIMITER_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Builds the state and the full router. Must be called inside a Tokio runtime.
///
/// The state is returned so the caller can drain the activity log once the
/// server stops.
pub fn build_app(db: Database, config: Config) -> (Router, SharedState) {
    let state: SharedState = Arc::new(AppState::new(&db, config));
    spawn_limiter_sweeper(&state);
    (router(state.clone()), state)
}

pub fn router(state: SharedState) -> Router {
    let max_body_size = state.config.max_body_size;
    let cors = cors_layer(&state.config.base_url);

    Router::new()
        .merge(routes::api_routes().with_state(state.clone()))
        .merge(entities::routes(&state))
        .route("/health", axum::routing::get(health))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(TraceLayer::new_for_http())
}

/// The back-office runs on `base_url`; it is the only origin allowed to send credentials.
fn cors_layer(base_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    match HeaderValue::from_str(base_url.trim_end_matches('/')) {
        Ok(origin) => layer.allow_origin(origin).allow_credentials(true),
        Err(e) => {
            tracing::warn!("Invalid base URL for CORS ({e}), cross-origin requests disabled");
            layer
        }
    }
}

/// Periodically drops stale rate limiter entries.
pub fn spawn_limiter_sweeper(state: &SharedState) {
    let state = Arc::downgrade(state);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(LIMITER_SWEEP_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            let Some(state) = state.upgrade() else {
                break;
            };
            state.login_limiter.cleanup(LIMITER_MAX_AGE);
            state.contact_limiter.cleanup(LIMITER_MAX_AGE);
            tracing::debug!("Rate limiter entries swept");
        }
    });
}

async fn health() -> &'static str {
    "ok"
}
