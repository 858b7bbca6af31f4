use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::db::Database;
use crate::error::StoreError;
use crate::models::TransactionDraft;

/// Where receipt drafts end up. Retries and consistency belong to the store.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn create_transaction(&self, draft: &TransactionDraft) -> Result<(), StoreError>;
}

/// Local SQLite file.
#[derive(Clone)]
pub struct SqliteTransactionStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteTransactionStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::from_database(Database::new(path)?))
    }

    pub fn from_database(db: Database) -> Self {
        SqliteTransactionStore {
            db: Arc::new(Mutex::new(db)),
        }
    }

    pub fn database(&self) -> Arc<Mutex<Database>> {
        self.db.clone()
    }
}

#[async_trait]
impl TransactionStore for SqliteTransactionStore {
    async fn create_transaction(&self, draft: &TransactionDraft) -> Result<(), StoreError> {
        let db = self.db.lock().map_err(|_| StoreError::Lock)?;
        let id = db.insert_transaction(draft)?;
        debug!(%id, amount = draft.amount, "Stored transaction");
        Ok(())
    }
}

/// Remote store taking the draft as JSON on `POST <base>/api/transactions`.
#[derive(Clone)]
pub struct HttpTransactionStore {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpTransactionStore {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        HttpTransactionStore {
            client: reqwest::Client::new(),
            endpoint: format!("{}/api/transactions", base_url.trim_end_matches('/')),
            token,
        }
    }
}

#[async_trait]
impl TransactionStore for HttpTransactionStore {
    async fn create_transaction(&self, draft: &TransactionDraft) -> Result<(), StoreError> {
        let mut request = self.client.post(&self.endpoint).json(draft);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StoreError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
