use serde::{Deserialize, Serialize};

use crate::utils::{description_from_file_name, now_rfc3339, round_cents};

pub const DEFAULT_CATEGORY: &str = "Other";
pub const DEFAULT_PAYMENT_METHOD: &str = "Cash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Expense,
    Income,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Expense => "expense",
            TransactionType::Income => "income",
        }
    }
}

/// Minimal record handed to a transaction store after a receipt was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub date: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub payment_method: String,
}

impl TransactionDraft {
    /// Builds an expense draft for a receipt total. Returns `None` unless the
    /// amount is finite and strictly positive after rounding to cents.
    pub fn from_receipt(file_name: &str, amount: f64) -> Option<Self> {
        Self::from_receipt_at(file_name, amount, now_rfc3339())
    }

    pub fn from_receipt_at(file_name: &str, amount: f64, date: String) -> Option<Self> {
        if !amount.is_finite() {
            return None;
        }
        let amount = round_cents(amount);
        if amount <= 0.0 {
            return None;
        }
        Some(TransactionDraft {
            description: description_from_file_name(file_name),
            amount,
            category: DEFAULT_CATEGORY.to_string(),
            date,
            transaction_type: TransactionType::Expense,
            payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
        })
    }
}

/// Body of a successful `POST /ocr-upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResponse {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A file picked for upload, held in memory on the client side.
#[derive(Debug, Clone)]
pub struct ReceiptFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ReceiptFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        ReceiptFile {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

/// Row of the `transactions` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub date: String,
    pub transaction_type: String,
    pub payment_method: String,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_is_an_expense_with_defaults() {
        let draft =
            TransactionDraft::from_receipt_at("lunch.png", 42.0, "2024-01-01T00:00:00.000Z".into())
                .unwrap();
        assert_eq!(draft.description, "lunch");
        assert_eq!(draft.amount, 42.0);
        assert_eq!(draft.category, "Other");
        assert_eq!(draft.payment_method, "Cash");
        assert_eq!(draft.transaction_type, TransactionType::Expense);
    }

    #[test]
    fn draft_rounds_to_cents() {
        let draft = TransactionDraft::from_receipt_at("r.jpg", 10.129, String::new()).unwrap();
        assert_eq!(draft.amount, 10.13);
    }

    #[test]
    fn no_draft_for_non_positive_amounts() {
        assert!(TransactionDraft::from_receipt_at("r.jpg", 0.0, String::new()).is_none());
        assert!(TransactionDraft::from_receipt_at("r.jpg", -3.5, String::new()).is_none());
        assert!(TransactionDraft::from_receipt_at("r.jpg", 0.001, String::new()).is_none());
        assert!(TransactionDraft::from_receipt_at("r.jpg", f64::NAN, String::new()).is_none());
    }

    #[test]
    fn draft_serializes_in_store_shape() {
        let draft = TransactionDraft::from_receipt_at("a.png", 5.5, "d".into()).unwrap();
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value["type"], "expense");
        assert_eq!(value["paymentMethod"], "Cash");
        assert_eq!(value["amount"], 5.5);
    }
}
