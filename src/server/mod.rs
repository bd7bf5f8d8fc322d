//! HTTP surface: the upload and health endpoints.
//!
//! ```text
//! POST /api/upload   multipart, one file under `document`
//! GET  /api/health   liveness
//! ```
//!
//! Router state is immutable: one shared [`Extractor`] and the
//! [`ServerConfig`]. Requests share nothing else.

pub mod error;
pub mod health;
pub mod upload;

use crate::config::ServerConfig;
use crate::extract::Extractor;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<Extractor>,
    pub server: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(extractor: Extractor, server: ServerConfig) -> Self {
        Self {
            extractor: Arc::new(extractor),
            server: Arc::new(server),
        }
    }
}

/// Build the router with CORS, request tracing and the body limit applied.
pub fn router(state: AppState) -> Router {
    let body_limit = state
        .server
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let cors = cors_layer(&state.server.allowed_origins);

    Router::new()
        .route("/api/upload", post(upload::upload_document))
        .route("/api/health", get(health::health))
        .layer(DefaultBodyLimit::max(
            usize::try_from(body_limit).unwrap_or(usize::MAX),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if origins.is_empty() {
        return base.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();
    base.allow_origin(parsed)
}

/// Bind and serve until Ctrl+C.
///
/// Creates the upload directory first; a directory that cannot be created
/// is a start-up failure.
pub async fn serve(extractor: Extractor, config: ServerConfig) -> std::io::Result<()> {
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        addr = %addr,
        model = extractor.model_name(),
        upload_dir = %config.upload_dir.display(),
        max_upload_mb = config.max_upload_bytes / 1024 / 1024,
        "Document extraction service listening"
    );

    let app = router(AppState::new(extractor, config));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
