use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::debug;

use crate::config::ServerConfig;
use crate::error::{RecognitionError, StagingError};
use crate::services::staging::StagingArea;
use crate::services::text_extraction::OcrEngine;

/// Shared by every request of one server instance.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub staging: StagingArea,
    engine: Arc<dyn OcrEngine>,
    recognitions: Arc<Semaphore>,
}

impl AppState {
    pub fn new(config: ServerConfig, engine: Arc<dyn OcrEngine>) -> Result<Self, StagingError> {
        let staging = StagingArea::open(&config.upload_dir)?;
        let recognitions = Arc::new(Semaphore::new(config.max_concurrent_recognitions.max(1)));
        Ok(AppState {
            config: Arc::new(config),
            staging,
            engine,
            recognitions,
        })
    }

    /// Runs the engine on a blocking worker once a recognition slot is free.
    pub async fn recognize(&self, image: PathBuf) -> Result<String, RecognitionError> {
        let permit = self
            .recognitions
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| RecognitionError::Aborted(e.to_string()))?;

        let engine = self.engine.clone();
        let language = self.config.ocr_language.clone();
        debug!(path = %image.display(), %language, "Recognizing");
        // The slot stays taken until the engine returns, even if the caller
        // is dropped first.
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            engine.recognize(&image, &language)
        })
        .await
        .map_err(|e| RecognitionError::Aborted(e.to_string()))?
    }
}
