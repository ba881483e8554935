use super::query::run_query;
use super::registry::{CollectionRegistry, SharedCollection};
use application::{ApplicationError, Clock, DocumentStore, SystemClock, format_timestamp};
use async_trait::async_trait;
use domain::{Document, DocumentId, Fields, QueryOptions};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// In-memory [`DocumentStore`] bound to one collection of a [`CollectionRegistry`].
///
/// Every operation takes the collection lock once and finishes inside it, so
/// operations on the same collection never interleave. Reads and writes hand
/// back clones; nothing returned aliases stored state.
#[derive(Clone)]
pub struct MemoryStorageService {
    name: String,
    collection: SharedCollection,
    clock: Arc<dyn Clock>,
}

impl MemoryStorageService {
    pub fn new(registry: &CollectionRegistry, name: impl Into<String>) -> Self {
        Self::with_clock(registry, name, Arc::new(SystemClock))
    }

    pub fn with_clock(
        registry: &CollectionRegistry,
        name: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let name = name.into();
        let collection = registry.collection(&name);
        Self {
            name,
            collection,
            clock,
        }
    }

    fn not_found(&self, id: &DocumentId) -> ApplicationError {
        warn!(collection = %self.name, doc_id = %id, "Document not found");
        ApplicationError::not_found(&self.name, id)
    }
}

impl fmt::Debug for MemoryStorageService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStorageService")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DocumentStore for MemoryStorageService {
    fn collection_name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, data), fields(collection = %self.name))]
    async fn create(&self, data: Fields) -> Result<Document, ApplicationError> {
        let mut collection = self.collection.write().await;
        let now = self.clock.now();
        let id = collection.next_id(&self.name, now.timestamp_millis());
        let document = Document::new(id, &format_timestamp(now), data);
        collection.documents.push(document.clone());
        debug!(doc_id = %document.id(), "Created document in in-memory store");
        Ok(document)
    }

    #[instrument(skip(self), fields(collection = %self.name))]
    async fn get_by_id(&self, id: &DocumentId) -> Result<Document, ApplicationError> {
        debug!(doc_id = %id, "Getting document from in-memory store");
        let collection = self.collection.read().await;
        collection
            .documents
            .iter()
            .find(|doc| doc.id() == id.as_str())
            .cloned()
            .ok_or_else(|| self.not_found(id))
    }

    #[instrument(skip(self, data), fields(collection = %self.name))]
    async fn update(&self, id: &DocumentId, data: Fields) -> Result<Document, ApplicationError> {
        debug!(doc_id = %id, field_count = data.len(), "Updating document in in-memory store");
        let mut collection = self.collection.write().await;
        let position = collection.position(id).ok_or_else(|| self.not_found(id))?;
        let timestamp = self.clock.timestamp();
        let document = &mut collection.documents[position];
        document.merge(data, &timestamp);
        Ok(document.clone())
    }

    #[instrument(skip(self), fields(collection = %self.name))]
    async fn delete(&self, id: &DocumentId) -> Result<bool, ApplicationError> {
        debug!(doc_id = %id, "Deleting document from in-memory store");
        let mut collection = self.collection.write().await;
        let position = collection.position(id).ok_or_else(|| self.not_found(id))?;
        collection.documents.remove(position);
        Ok(true)
    }

    #[instrument(skip(self, options), fields(collection = %self.name))]
    async fn get_active(&self, options: &QueryOptions) -> Result<Vec<Document>, ApplicationError> {
        let collection = self.collection.read().await;
        let results = run_query(
            collection.documents.iter().filter(|doc| !doc.is_deleted()),
            options,
        );
        debug!(
            filters = options.filters.len(),
            returned = results.len(),
            "Queried active documents"
        );
        Ok(results)
    }

    #[instrument(skip(self, options), fields(collection = %self.name))]
    async fn get_all(&self, options: &QueryOptions) -> Result<Vec<Document>, ApplicationError> {
        let collection = self.collection.read().await;
        let results = run_query(&collection.documents, options);
        debug!(
            filters = options.filters.len(),
            returned = results.len(),
            "Queried all documents"
        );
        Ok(results)
    }
}
