use reqwest::multipart::{Form, Part};

use crate::config::RECEIPT_FIELD;
use crate::error::IntakeError;
use crate::models::{ErrorResponse, OcrResponse, ReceiptFile};

/// Talks to the upload endpoint of a running receipt server.
#[derive(Debug, Clone)]
pub struct OcrClient {
    client: reqwest::Client,
    base_url: String,
}

impl OcrClient {
    pub fn new(base_url: &str) -> Self {
        OcrClient {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn upload(&self, file: &ReceiptFile) -> Result<String, IntakeError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime)
            .map_err(|e| IntakeError::Transport(e.to_string()))?;
        let form = Form::new().part(RECEIPT_FIELD, part);

        let response = self
            .client
            .post(format!("{}/ocr-upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| IntakeError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| "Upload failed".to_string());
            return Err(IntakeError::Endpoint {
                status: status.as_u16(),
                message,
            });
        }

        let body: OcrResponse = response
            .json()
            .await
            .map_err(|e| IntakeError::Transport(e.to_string()))?;
        Ok(body.text)
    }
}
