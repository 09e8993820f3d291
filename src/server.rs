//! HTTP Server
//!
//! Exposes contract generation and editing as `text/event-stream` endpoints,
//! plus cancellation and edit suggestions. Authentication is expected to sit in
//! front of this router.

use crate::error::ApiError;
use axum::Router;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

pub mod routes;
pub mod sse;

pub use routes::{api_router, AppState, SharedState};
pub use sse::{sse_format, SseEncoder};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allow any origin. Intended for local development with a separate UI dev server.
    #[serde(default)]
    pub permissive_cors: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            permissive_cors: false,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("host cannot be empty".to_string());
        }
        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub fn build_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let app = api_router().with_state(state);
    if config.permissive_cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), ApiError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state, config);
    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ApiError::ServerError(format!("Failed to bind to {}: {}", addr, e)))?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| ApiError::ServerError(e.to_string()))?;
    info!(address = %local_addr, "Clausecraft server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ApiError::ServerError(e.to_string()))?;

    info!("Server shut down gracefully");
    Ok(())
}
