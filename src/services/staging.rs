use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::StagingError;

/// An uploaded file written to the staging directory.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub name: String,
    pub path: PathBuf,
}

/// Server-local directory holding uploads. Every upload gets a fresh
/// `<uuid>.<ext>` name, so concurrent requests never collide.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StagingError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(StagingArea { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn stage(&self, bytes: &[u8], mime: &str) -> Result<StagedFile, StagingError> {
        let name = format!("{}.{}", uuid::Uuid::new_v4().simple(), extension_for(mime));
        let path = self.dir.join(&name);
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "Staged upload");
        Ok(StagedFile { name, path })
    }

    /// Deletes staged files last modified more than `ttl` ago.
    pub fn sweep(&self, ttl: Duration) -> Result<usize, StagingError> {
        let now = SystemTime::now();
        let mut removed = 0;
        for entry in walkdir::WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            let age = now.duration_since(modified).unwrap_or_default();
            if age >= ttl {
                match std::fs::remove_file(entry.path()) {
                    Ok(()) => removed += 1,
                    Err(e) => warn!(
                        path = %entry.path().display(),
                        error = %e,
                        "Could not remove staged file"
                    ),
                }
            }
        }
        Ok(removed)
    }

    /// Sweeps every `interval` until the returned task is aborted.
    pub fn spawn_sweeper(&self, ttl: Duration, interval: Duration) -> JoinHandle<()> {
        let staging = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let area = staging.clone();
                match tokio::task::spawn_blocking(move || area.sweep(ttl)).await {
                    Ok(Ok(0)) => {}
                    Ok(Ok(removed)) => info!(removed, "Swept stale uploads"),
                    Ok(Err(e)) => warn!(error = %e, "Staging sweep failed"),
                    Err(e) => warn!(error = %e, "Staging sweep aborted"),
                }
            }
        })
    }
}

fn extension_for(mime: &str) -> &'static str {
    match mime.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        _ => "bin",
    }
}
