//! Client-side receipt intake.
//!
//! `Idle -> FileSelected -> Uploading -> {Succeeded, Failed}`; removing the
//! file or closing goes back to `Idle`. Only one upload per instance is in
//! flight. A successful upload always reports its text, and an inferred total
//! is recorded in the transaction store on a detached task whose failure
//! never reaches the caller.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{IntakeError, StoreError, ValidationError};
use crate::models::{ReceiptFile, TransactionDraft};
use crate::services::amount::{AmountExtractor, MoneyCandidate};
use crate::services::client::OcrClient;
use crate::services::selection::validate_selection;
use crate::services::store::TransactionStore;

#[derive(Debug, Clone, PartialEq)]
pub enum IntakeState {
    Idle,
    FileSelected,
    Uploading,
    Succeeded { text: String },
    Failed { message: String },
}

/// In-memory preview of a selected image.
#[derive(Debug, Clone)]
pub struct Preview {
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

/// Store submission running detached from the OCR result.
pub struct PendingPersist {
    handle: JoinHandle<Result<(), StoreError>>,
}

impl PendingPersist {
    /// Waits for the store. Only callers that care (tests, a CLI about to
    /// exit) look at this; the intake itself never does.
    pub async fn settled(self) -> Result<(), StoreError> {
        self.handle
            .await
            .map_err(|e| StoreError::Aborted(e.to_string()))?
    }
}

pub struct IntakeOutcome {
    pub text: String,
    pub amount: Option<MoneyCandidate>,
    pub draft: Option<TransactionDraft>,
    pub persist: Option<PendingPersist>,
}

struct Inner {
    state: IntakeState,
    file: Option<ReceiptFile>,
    preview: Option<Preview>,
}

const UPLOAD_CANCELLED: &str = "Upload cancelled";

/// Owns the `Uploading` state. Whatever way `submit` exits, including its
/// future being dropped mid-request, the state leaves `Uploading`.
struct UploadGuard {
    inner: Arc<Mutex<Inner>>,
    settled: bool,
}

impl UploadGuard {
    fn new(inner: Arc<Mutex<Inner>>) -> Self {
        UploadGuard {
            inner,
            settled: false,
        }
    }

    fn settle(mut self, state: IntakeState) {
        self.set(state);
        self.settled = true;
    }

    fn set(&self, state: IntakeState) {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.state = state;
    }
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Receipt upload cancelled before it settled");
            self.set(IntakeState::Failed {
                message: UPLOAD_CANCELLED.to_string(),
            });
        }
    }
}

#[derive(Clone)]
pub struct ReceiptIntake {
    client: OcrClient,
    store: Arc<dyn TransactionStore>,
    extractor: AmountExtractor,
    inner: Arc<Mutex<Inner>>,
}

impl ReceiptIntake {
    pub fn new(client: OcrClient, store: Arc<dyn TransactionStore>) -> Self {
        Self::with_extractor(client, store, AmountExtractor::default())
    }

    pub fn with_extractor(
        client: OcrClient,
        store: Arc<dyn TransactionStore>,
        extractor: AmountExtractor,
    ) -> Self {
        ReceiptIntake {
            client,
            store,
            extractor,
            inner: Arc::new(Mutex::new(Inner {
                state: IntakeState::Idle,
                file: None,
                preview: None,
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, IntakeError> {
        self.inner.lock().map_err(|_| IntakeError::Lock)
    }

    pub fn state(&self) -> Result<IntakeState, IntakeError> {
        Ok(self.lock()?.state.clone())
    }

    pub fn preview(&self) -> Result<Option<Preview>, IntakeError> {
        Ok(self.lock()?.preview.clone())
    }

    pub fn selected_file(&self) -> Result<Option<ReceiptFile>, IntakeError> {
        Ok(self.lock()?.file.clone())
    }

    /// Replaces the current selection. Rejected files leave the previous
    /// selection in place.
    pub fn select_file(&self, file: ReceiptFile) -> Result<(), IntakeError> {
        validate_selection(&file)?;
        let mut inner = self.lock()?;
        if inner.state == IntakeState::Uploading {
            return Err(IntakeError::Busy);
        }
        inner.preview = file.is_image().then(|| Preview {
            mime: file.mime.clone(),
            bytes: Arc::from(file.bytes.as_slice()),
        });
        inner.file = Some(file);
        inner.state = IntakeState::FileSelected;
        Ok(())
    }

    pub fn remove_file(&self) -> Result<(), IntakeError> {
        let mut inner = self.lock()?;
        if inner.state == IntakeState::Uploading {
            return Err(IntakeError::Busy);
        }
        inner.file = None;
        inner.preview = None;
        inner.state = IntakeState::Idle;
        Ok(())
    }

    pub fn close(&self) -> Result<(), IntakeError> {
        self.remove_file()
    }

    /// Uploads the selected file and reports the recognized text.
    pub async fn submit(&self) -> Result<IntakeOutcome, IntakeError> {
        let (file, upload) = {
            let mut inner = self.lock()?;
            if inner.state == IntakeState::Uploading {
                return Err(IntakeError::Busy);
            }
            let file = inner.file.clone().ok_or(ValidationError::Missing)?;
            inner.state = IntakeState::Uploading;
            (file, UploadGuard::new(self.inner.clone()))
        };

        let text = match self.client.upload(&file).await {
            Ok(text) => text,
            Err(e) => {
                warn!(file = %file.name, error = %e, "Receipt upload failed");
                upload.settle(IntakeState::Failed {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        let amount = self.extractor.extract(&text);
        let draft = amount
            .as_ref()
            .and_then(|candidate| TransactionDraft::from_receipt(&file.name, candidate.value));
        let persist = draft.clone().map(|draft| self.persist(draft));

        info!(
            file = %file.name,
            chars = text.len(),
            amount = amount.as_ref().map(|c| c.value),
            "Receipt recognized"
        );
        upload.settle(IntakeState::Succeeded { text: text.clone() });

        Ok(IntakeOutcome {
            text,
            amount,
            draft,
            persist,
        })
    }

    fn persist(&self, draft: TransactionDraft) -> PendingPersist {
        let store = self.store.clone();
        let handle = tokio::spawn(async move {
            let result = store.create_transaction(&draft).await;
            if let Err(e) = &result {
                warn!(
                    description = %draft.description,
                    amount = draft.amount,
                    error = %e,
                    "Transaction not recorded"
                );
            }
            result
        });
        PendingPersist { handle }
    }
}
