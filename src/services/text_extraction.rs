use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use crate::config::OcrBackend;
use crate::error::RecognitionError;

/// Plain-text OCR over a raster image on disk. Calls block for as long as
/// recognition takes, usually seconds.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &Path, language: &str) -> Result<String, RecognitionError>;
}

/// Runs the `tesseract` executable and reads its stdout.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    program: String,
}

impl Default for TesseractCli {
    fn default() -> Self {
        TesseractCli {
            program: "tesseract".to_string(),
        }
    }
}

impl TesseractCli {
    pub fn with_program(program: impl Into<String>) -> Self {
        TesseractCli {
            program: program.into(),
        }
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &Path, language: &str) -> Result<String, RecognitionError> {
        let output = Command::new(&self.program)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .output()
            .map_err(|e| RecognitionError::Init(format!("{}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognitionError::Recognize(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// In-process libtesseract.
#[cfg(feature = "libtesseract")]
#[derive(Debug, Default, Clone, Copy)]
pub struct TesseractLib;

#[cfg(feature = "libtesseract")]
impl OcrEngine for TesseractLib {
    fn recognize(&self, image: &Path, language: &str) -> Result<String, RecognitionError> {
        let path = image
            .to_str()
            .ok_or_else(|| RecognitionError::Image("Invalid path".to_string()))?;
        tesseract::Tesseract::new(None, Some(language))
            .map_err(|e| RecognitionError::Init(e.to_string()))?
            .set_image(path)
            .map_err(|e| RecognitionError::Image(e.to_string()))?
            .recognize()
            .map_err(|e| RecognitionError::Recognize(e.to_string()))?
            .get_text()
            .map_err(|e| RecognitionError::Recognize(format!("OCR text: {}", e)))
    }
}

pub fn engine_for(backend: OcrBackend) -> anyhow::Result<Arc<dyn OcrEngine>> {
    match backend {
        OcrBackend::Cli => Ok(Arc::new(TesseractCli::default())),
        #[cfg(feature = "libtesseract")]
        OcrBackend::Library => Ok(Arc::new(TesseractLib)),
        #[cfg(not(feature = "libtesseract"))]
        OcrBackend::Library => Err(anyhow::anyhow!(
            "Library OCR backend requires building with --features libtesseract"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_executable_is_a_recognition_error() {
        let engine = TesseractCli::with_program("definitely-not-a-real-ocr-binary");
        let err = engine
            .recognize(Path::new("receipt.png"), "eng")
            .unwrap_err();
        assert!(matches!(err, RecognitionError::Init(_)));
    }

    #[test]
    fn cli_backend_is_always_available() {
        assert!(engine_for(OcrBackend::Cli).is_ok());
    }
}
