use thiserror::Error;

/// Fault inside the OCR engine: corrupt image, unsupported format, timeout.
#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error("OCR engine init: {0}")]
    Init(String),

    #[error("OCR engine could not read image: {0}")]
    Image(String),

    #[error("OCR recognize: {0}")]
    Recognize(String),

    #[error("OCR worker aborted: {0}")]
    Aborted(String),
}

#[derive(Error, Debug)]
pub enum StagingError {
    #[error("Staging IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Staging directory scan: {0}")]
    Scan(#[from] walkdir::Error),
}

/// Rejection by the external transaction store. Never surfaced to the user
/// by the intake workflow.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Store unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("Store rejected transaction ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Store not authorized")]
    Unauthorized,

    #[error("Store lock poisoned")]
    Lock,

    #[error("Store task aborted: {0}")]
    Aborted(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
}

/// Problems with the selected file, found before any network work.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select a file first")]
    Missing,

    #[error("OCR currently supports images (JPG/PNG). Please upload an image.")]
    PdfNotSupported,

    #[error("Please select a PDF, JPG, or PNG file")]
    Unsupported { mime: String },
}

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The endpoint answered with an error, e.g. the opaque OCR failure.
    #[error("{message}")]
    Endpoint { status: u16, message: String },

    #[error("{0}")]
    Transport(String),

    #[error("An upload is already in progress")]
    Busy,

    #[error("Intake state lock poisoned")]
    Lock,
}
