use async_trait::async_trait;
use domain::{
    BalanceSummary, Document, DocumentId, DomainError, Fields, FilterOperator, IS_DELETED_FIELD,
    NewTransaction, QueryOptions, SortDirection, Transaction, TransactionKind, TransactionPatch,
    TransactionStatus,
};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock, format_timestamp};

// --- Application Errors ---
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Document '{id}' not found in collection '{collection}'")]
    NotFound { collection: String, id: String },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Domain validation error: {0}")]
    DomainError(#[from] DomainError), // Propagate domain errors cleanly
    #[error("Stored document '{id}' has an unexpected shape: {reason}")]
    DataFormat { id: String, reason: String },
}

impl ApplicationError {
    pub fn not_found(collection: &str, id: &DocumentId) -> Self {
        ApplicationError::NotFound {
            collection: collection.to_string(),
            id: id.as_str().to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApplicationError::NotFound { .. })
    }
}

// --- Infrastructure Interfaces (Traits) ---

/// Document-store contract for one named collection.
///
/// Async so that a remote backend can be swapped in later; the in-memory
/// implementation resolves every call without suspending.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Name of the collection this store is bound to.
    fn collection_name(&self) -> &str;
    /// Creates a document from `data` and returns a copy of what was stored.
    async fn create(&self, data: Fields) -> Result<Document, ApplicationError>;
    /// Looks up a document by id, soft-deleted ones included.
    async fn get_by_id(&self, id: &DocumentId) -> Result<Document, ApplicationError>;
    /// Shallow-merges `data` into the document and re-stamps `updatedAt`.
    async fn update(&self, id: &DocumentId, data: Fields) -> Result<Document, ApplicationError>;
    /// Hard delete. Returns true once the document is gone.
    async fn delete(&self, id: &DocumentId) -> Result<bool, ApplicationError>;
    /// Non-deleted documents through the filter -> sort -> limit pipeline.
    async fn get_active(&self, options: &QueryOptions) -> Result<Vec<Document>, ApplicationError>;
    /// Every document, soft-deleted included, through the same pipeline.
    async fn get_all(&self, options: &QueryOptions) -> Result<Vec<Document>, ApplicationError>;
    /// Marks a document deleted without removing it.
    #[instrument(skip(self))]
    async fn soft_delete(&self, id: &DocumentId) -> Result<bool, ApplicationError> {
        debug!(doc_id = %id, "Soft deleting via update");
        let mut data = Fields::new();
        data.insert(IS_DELETED_FIELD.to_string(), Value::Bool(true));
        self.update(id, data).await?;
        Ok(true)
    }
}

// --- Application Services (Use Cases) ---

/// Income/expense bookkeeping on top of a [`DocumentStore`].
pub struct TransactionService {
    store: Arc<dyn DocumentStore>,
}

impl TransactionService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, entry), fields(collection = %self.store.collection_name(), kind = entry.kind.as_str()))]
    pub async fn record(&self, entry: NewTransaction) -> Result<Transaction, ApplicationError> {
        info!("Attempting to record transaction");
        entry.validate()?; // Propagates DomainError via From impl
        let document = self.store.create(entry.into_fields()).await?;
        info!(doc_id = %document.id(), "Transaction recorded");
        to_transaction(document)
    }

    pub async fn record_income(
        &self,
        mut entry: NewTransaction,
    ) -> Result<Transaction, ApplicationError> {
        entry.kind = TransactionKind::Income;
        self.record(entry).await
    }

    pub async fn record_expense(
        &self,
        mut entry: NewTransaction,
    ) -> Result<Transaction, ApplicationError> {
        entry.kind = TransactionKind::Expense;
        self.record(entry).await
    }

    #[instrument(skip(self), fields(collection = %self.store.collection_name()))]
    pub async fn get(&self, id: &DocumentId) -> Result<Transaction, ApplicationError> {
        let document = self.store.get_by_id(id).await?;
        to_transaction(document)
    }

    /// Active transactions shaped by caller-provided options.
    #[instrument(skip(self, options), fields(collection = %self.store.collection_name()))]
    pub async fn list(&self, options: &QueryOptions) -> Result<Vec<Transaction>, ApplicationError> {
        let documents = self.store.get_active(options).await?;
        debug!(count = documents.len(), "Listing transactions");
        documents.into_iter().map(to_transaction).collect()
    }

    /// Most recent entries first, by booking date.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<Transaction>, ApplicationError> {
        let options = QueryOptions::new()
            .order_by("date", SortDirection::Desc)
            .limit(limit);
        self.list(&options).await
    }

    pub async fn list_by_kind(
        &self,
        kind: TransactionKind,
    ) -> Result<Vec<Transaction>, ApplicationError> {
        let options = QueryOptions::new().filter("type", FilterOperator::Eq, kind.as_str());
        self.list(&options).await
    }

    #[instrument(skip(self, patch), fields(collection = %self.store.collection_name()))]
    pub async fn edit(
        &self,
        id: &DocumentId,
        patch: TransactionPatch,
    ) -> Result<Transaction, ApplicationError> {
        info!(doc_id = %id, "Attempting to edit transaction");
        if patch.is_empty() {
            warn!(doc_id = %id, "Edit rejected: empty patch");
            return Err(ApplicationError::InvalidInput(
                "Transaction patch contains no fields".to_string(),
            ));
        }
        patch.validate()?;
        let document = self.store.update(id, patch.into_fields()).await?;
        to_transaction(document)
    }

    /// Soft delete: the entry drops out of lists and summaries but stays retrievable.
    #[instrument(skip(self), fields(collection = %self.store.collection_name()))]
    pub async fn remove(&self, id: &DocumentId) -> Result<(), ApplicationError> {
        info!(doc_id = %id, "Attempting to remove transaction");
        self.store.soft_delete(id).await?;
        Ok(())
    }

    /// Hard delete.
    #[instrument(skip(self), fields(collection = %self.store.collection_name()))]
    pub async fn purge(&self, id: &DocumentId) -> Result<(), ApplicationError> {
        info!(doc_id = %id, "Attempting to purge transaction");
        self.store.delete(id).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(collection = %self.store.collection_name()))]
    pub async fn summary(&self) -> Result<BalanceSummary, ApplicationError> {
        let options = QueryOptions::new().filter(
            "status",
            FilterOperator::Ne,
            TransactionStatus::Cancelled.as_str(),
        );
        let transactions = self.list(&options).await?;
        let summary = BalanceSummary::tally(&transactions);
        info!(
            income = summary.total_income,
            expense = summary.total_expense,
            count = summary.transaction_count,
            "Balance summary computed"
        );
        Ok(summary)
    }
}

fn to_transaction(document: Document) -> Result<Transaction, ApplicationError> {
    let id = document.id().to_string();
    Transaction::try_from(document).map_err(|e| {
        error!(doc_id = %id, "Failed to read transaction from document: {}", e);
        ApplicationError::DataFormat {
            id,
            reason: e.to_string(),
        }
    })
}
