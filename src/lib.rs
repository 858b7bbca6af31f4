//! Receipt intake: an OCR upload service, a heuristic receipt-total
//! extractor, and the client workflow that turns a recognized receipt into an
//! expense transaction.

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod server;
pub mod services;
pub mod utils;

pub use config::{OcrBackend, ServerConfig};
pub use error::{IntakeError, RecognitionError, StoreError, ValidationError};
pub use models::{ReceiptFile, TransactionDraft, TransactionType};
pub use server::ReceiptServer;
pub use services::amount::{extract_amount, AmountExtractor, AmountStrategy, MoneyCandidate};
pub use services::client::OcrClient;
pub use services::processor::{IntakeOutcome, IntakeState, ReceiptIntake};
pub use services::store::{HttpTransactionStore, SqliteTransactionStore, TransactionStore};
pub use services::text_extraction::OcrEngine;
