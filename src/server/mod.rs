//! HTTP surface over [`Converter`].
//!
//! ```text
//! GET  /                          liveness message
//! POST /api/convert               batch conversion
//! POST /api/merge                 composite assembly
//! POST /api/compress              JPEG recompression
//! GET  /api/download/:filename    stored artifact (?name= overrides the saved name)
//! ```
//!
//! Uploading is someone else's job: request bodies reference files already
//! stored under [`ServerConfig::upload_dir`], and any path that resolves
//! outside it is rejected.

mod error;
mod handlers;

pub use error::ApiError;

use crate::convert::Converter;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Listener and request-admission settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory the upload step stores files in.
    pub upload_dir: PathBuf,
    /// Conversion requests allowed to run at once; the rest wait.
    pub max_concurrent_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            upload_dir: PathBuf::from("uploads"),
            max_concurrent_requests: 8,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub converter: Arc<Converter>,
    /// Canonical form of the upload directory.
    pub upload_dir: Arc<PathBuf>,
    pub semaphore: Arc<Semaphore>,
}

impl AppState {
    /// Creates the upload directory if needed.
    pub async fn new(converter: Converter, config: &ServerConfig) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(&config.upload_dir).await?;
        let upload_dir = tokio::fs::canonicalize(&config.upload_dir).await?;
        Ok(Self {
            converter: Arc::new(converter),
            upload_dir: Arc::new(upload_dir),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_requests.max(1))),
        })
    }

    /// Check that `path` stays inside the upload directory.
    ///
    /// Existing files are canonicalised so symlinks cannot escape. A path
    /// that does not exist is accepted unless it climbs with `..`; the
    /// converter then reports it as a missing input.
    pub async fn confine_upload(&self, path: &Path) -> Option<PathBuf> {
        match tokio::fs::canonicalize(path).await {
            Ok(canonical) if canonical.starts_with(self.upload_dir.as_path()) => Some(canonical),
            Ok(_) => None,
            Err(_) if path.components().any(|c| matches!(c, Component::ParentDir)) => None,
            Err(_) => Some(path.to_path_buf()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/convert", post(handlers::convert))
        .route("/api/merge", post(handlers::merge))
        .route("/api/compress", post(handlers::compress))
        .route("/api/download/:filename", get(handlers::download))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: ServerConfig, converter: Converter) -> std::io::Result<()> {
    let output_dir = converter.output_dir().to_path_buf();
    let state = AppState::new(converter, &config).await?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    let local: SocketAddr = listener.local_addr()?;
    tracing::info!("Files Converter API listening on http://{}", local);
    tracing::info!("  uploads from {}", config.upload_dir.display());
    tracing::info!("  artifacts in {}", output_dir.display());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutting down");
    }
}
