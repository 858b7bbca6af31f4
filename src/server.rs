//! HTTP surface of the receipt OCR service.
//!
//! Routes:
//! - `GET /` liveness text
//! - `POST /ocr-upload` multipart upload under the `receipt` field
//! - `GET /uploads/<name>` read-only access to staged uploads

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::commands::ocr::{health, ocr_upload};
use crate::config::ServerConfig;
use crate::services::state::AppState;
use crate::services::text_extraction::OcrEngine;

pub fn router(state: AppState) -> Router {
    let uploads = ServeDir::new(state.staging.dir());
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(health))
        .route("/ocr-upload", post(ocr_upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .nest_service("/uploads", uploads)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// An explicitly constructed server: configuration and engine go in, nothing
/// is process-global.
pub struct ReceiptServer {
    state: AppState,
}

impl ReceiptServer {
    pub fn new(config: ServerConfig, engine: Arc<dyn OcrEngine>) -> Result<Self> {
        let state = AppState::new(config, engine)?;
        Ok(ReceiptServer { state })
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    pub async fn bind(&self) -> Result<TcpListener> {
        Ok(TcpListener::bind(self.state.config.bind_addr).await?)
    }

    /// Serves on `listener` until `shutdown` resolves, sweeping stale uploads
    /// in the background.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = listener.local_addr()?;
        let config = self.state.config.clone();
        let sweeper = self
            .state
            .staging
            .spawn_sweeper(config.staging_ttl, config.sweep_interval);

        info!(
            %addr,
            upload_dir = %config.upload_dir.display(),
            language = %config.ocr_language,
            "Server running"
        );

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await;
        sweeper.abort();
        Ok(result?)
    }
}
