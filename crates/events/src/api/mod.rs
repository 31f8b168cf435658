//! HTTP query API
//!
//! - `POST /events`: events of one project, optionally filtered by action
//! - `GET /`, `GET /health`, `GET /favicon.ico`: liveness probe answering "OK"

pub mod error;
pub mod handlers;
pub mod models;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use store::EventStore;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowHeaders, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub use error::{ApiError, INTERNAL_ERROR_MESSAGE};
pub use models::{EventRequest, EventResponse};

/// Origins allowed to call the API from a browser
pub const DEFAULT_CORS_ORIGINS: &[&str] = &["https://testnet.tansu.dev", "https://app.tansu.dev"];

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }
}

pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(handlers::health_check))
        .route("/health", get(handlers::health_check))
        .route("/favicon.ico", get(handlers::health_check))
        .route("/events", post(handlers::get_events))
        .with_state(state)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        // wildcard headers are rejected together with credentials
        .allow_headers(AllowHeaders::mirror_request())
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> axum::response::Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("Request handler panicked: {}", detail);
    error::internal_error_response()
}

/// Serve the router until Ctrl+C
pub async fn serve(addr: SocketAddr, router: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Event API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Event API server failed")?;

    info!("Event API stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
    }
}
