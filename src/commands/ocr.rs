use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, info, warn};

use crate::config::RECEIPT_FIELD;
use crate::error::StagingError;
use crate::models::{ErrorResponse, OcrResponse};
use crate::services::state::AppState;

/// Failures of `POST /ocr-upload`. Engine detail is logged, never returned.
#[derive(Debug)]
pub enum UploadError {
    MissingFile,
    ExtraFile,
    UnsupportedType(String),
    Malformed { status: StatusCode, message: String },
    Staging(StagingError),
    Recognition,
}

impl UploadError {
    fn status(&self) -> StatusCode {
        match self {
            UploadError::MissingFile | UploadError::ExtraFile | UploadError::UnsupportedType(_) => {
                StatusCode::BAD_REQUEST
            }
            UploadError::Malformed { status, .. } => *status,
            UploadError::Staging(_) | UploadError::Recognition => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            UploadError::MissingFile => "No file uploaded".to_string(),
            UploadError::ExtraFile => "Only one file per request".to_string(),
            UploadError::UnsupportedType(mime) => format!("Unsupported file type: {}", mime),
            UploadError::Malformed { message, .. } => message.clone(),
            UploadError::Staging(_) => "Upload failed".to_string(),
            UploadError::Recognition => "OCR failed".to_string(),
        }
    }
}

impl From<MultipartError> for UploadError {
    fn from(e: MultipartError) -> Self {
        UploadError::Malformed {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl From<MultipartRejection> for UploadError {
    fn from(e: MultipartRejection) -> Self {
        UploadError::Malformed {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

struct Upload {
    file_name: Option<String>,
    mime: String,
    bytes: axum::body::Bytes,
}

/// POST /ocr-upload - stage one receipt image and return its text
pub async fn ocr_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<OcrResponse>, UploadError> {
    let upload = read_receipt(multipart?).await?;

    if !state.config.is_allowed(&upload.mime) {
        warn!(mime = %upload.mime, "Rejected upload type");
        return Err(UploadError::UnsupportedType(upload.mime));
    }

    let staged = state
        .staging
        .stage(&upload.bytes, &upload.mime)
        .await
        .map_err(|e| {
            error!(error = %e, "Could not stage upload");
            UploadError::Staging(e)
        })?;

    info!(
        file = upload.file_name.as_deref().unwrap_or("<unnamed>"),
        path = %staged.path.display(),
        "Processing"
    );

    match state.recognize(staged.path.clone()).await {
        Ok(text) => Ok(Json(OcrResponse { text })),
        Err(e) => {
            error!(path = %staged.path.display(), error = %e, "OCR error");
            Err(UploadError::Recognition)
        }
    }
}

async fn read_receipt(mut multipart: Multipart) -> Result<Upload, UploadError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(RECEIPT_FIELD) {
            continue;
        }
        if upload.is_some() {
            return Err(UploadError::ExtraFile);
        }
        let file_name = field.file_name().map(str::to_string);
        let mime = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_ascii_lowercase();
        let bytes = field.bytes().await?;
        upload = Some(Upload {
            file_name,
            mime,
            bytes,
        });
    }
    upload.ok_or(UploadError::MissingFile)
}

/// GET / - liveness
pub async fn health() -> &'static str {
    "Backend working ✅"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::error::RecognitionError;
    use crate::server::router;
    use crate::services::text_extraction::OcrEngine;
    use axum::body::Body;
    use axum::http::Request;
    use std::path::Path;
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "receipt-test-boundary";

    struct FixedEngine(&'static str);

    impl OcrEngine for FixedEngine {
        fn recognize(&self, _image: &Path, _language: &str) -> Result<String, RecognitionError> {
            Ok(self.0.to_string())
        }
    }

    struct BrokenEngine;

    impl OcrEngine for BrokenEngine {
        fn recognize(&self, image: &Path, _language: &str) -> Result<String, RecognitionError> {
            Err(RecognitionError::Image(format!("corrupt image at {}", image.display())))
        }
    }

    fn state(dir: &Path, engine: Arc<dyn OcrEngine>) -> AppState {
        let config = ServerConfig {
            upload_dir: dir.to_path_buf(),
            ..ServerConfig::default()
        };
        AppState::new(config, engine).unwrap()
    }

    fn multipart_body(field: &str, mime: &str, bytes: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"receipt.png\"\r\n",
                field
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime).as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/ocr-upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn staged_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn health_route_answers() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(dir.path(), Arc::new(FixedEngine(""))));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], "Backend working ✅".as_bytes());
    }

    #[tokio::test]
    async fn returns_recognized_text() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(dir.path(), Arc::new(FixedEngine("TOTAL 42.00"))));

        let response = app
            .oneshot(upload_request(multipart_body("receipt", "image/png", b"png")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["text"], "TOTAL 42.00");
        assert_eq!(staged_files(dir.path()), 1);
    }

    #[tokio::test]
    async fn engine_fault_is_opaque_500_and_file_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(dir.path(), Arc::new(BrokenEngine)));

        let response = app
            .oneshot(upload_request(multipart_body("receipt", "image/jpeg", b"jpg")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "OCR failed");
        assert!(body.get("text").is_none());
        assert_eq!(staged_files(dir.path()), 1);
    }

    #[tokio::test]
    async fn missing_file_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(dir.path(), Arc::new(FixedEngine(""))));

        let response = app
            .oneshot(upload_request(multipart_body("other", "image/png", b"png")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No file uploaded");
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn pdf_is_rejected_before_staging() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(dir.path(), Arc::new(FixedEngine(""))));

        let response = app
            .oneshot(upload_request(multipart_body("receipt", "application/pdf", b"%PDF")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn non_multipart_body_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(dir.path(), Arc::new(FixedEngine(""))));

        let request = Request::builder()
            .method("POST")
            .uri("/ocr-upload")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert!(response.status().is_client_error());
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn staged_upload_is_served_for_preview() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), Arc::new(FixedEngine("x")));
        let staged = state.staging.stage(b"preview-bytes", "image/png").await.unwrap();
        let app = router(state);

        let request = Request::builder()
            .uri(format!("/uploads/{}", staged.name))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"preview-bytes");
    }
}
