use std::path::Path;

use crate::config::{IMAGE_MIME_TYPES, PDF_MIME};
use crate::error::ValidationError;
use crate::models::ReceiptFile;

/// Checks a picked file before anything is sent. PDFs are recognized but the
/// OCR path only reads images, so they get their own message.
pub fn validate_selection(file: &ReceiptFile) -> Result<(), ValidationError> {
    let mime = file.mime.to_ascii_lowercase();
    if mime == PDF_MIME {
        return Err(ValidationError::PdfNotSupported);
    }
    if !IMAGE_MIME_TYPES.contains(&mime.as_str()) {
        return Err(ValidationError::Unsupported { mime });
    }
    Ok(())
}

pub fn mime_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "pdf" => PDF_MIME,
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(mime: &str) -> ReceiptFile {
        ReceiptFile::new("receipt", mime, vec![1, 2, 3])
    }

    #[test]
    fn images_are_accepted() {
        for mime in ["image/jpeg", "image/png", "image/jpg", "IMAGE/PNG"] {
            assert!(validate_selection(&file(mime)).is_ok(), "{}", mime);
        }
    }

    #[test]
    fn pdf_has_a_dedicated_rejection() {
        assert_eq!(
            validate_selection(&file("application/pdf")),
            Err(ValidationError::PdfNotSupported)
        );
    }

    #[test]
    fn other_types_are_unsupported() {
        assert!(matches!(
            validate_selection(&file("image/gif")),
            Err(ValidationError::Unsupported { .. })
        ));
    }

    #[test]
    fn mime_by_extension() {
        assert_eq!(mime_from_path(Path::new("a/b/Receipt.JPG")), "image/jpeg");
        assert_eq!(mime_from_path(Path::new("r.png")), "image/png");
        assert_eq!(mime_from_path(Path::new("r.pdf")), "application/pdf");
        assert_eq!(mime_from_path(Path::new("r")), "application/octet-stream");
    }
}
