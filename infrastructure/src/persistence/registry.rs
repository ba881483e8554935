use dashmap::DashMap;
use domain::{Document, DocumentId};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// The documents of one named collection plus its id sequence.
#[derive(Debug, Default)]
pub(crate) struct Collection {
    pub(crate) documents: Vec<Document>,
    // Lives with the documents so every store handle draws from one sequence.
    next_sequence: u64,
}

impl Collection {
    /// `{collection}_{millis}_{sequence}`, sequence starting at 1.
    pub(crate) fn next_id(&mut self, name: &str, timestamp_millis: i64) -> DocumentId {
        self.next_sequence += 1;
        DocumentId::new(format!(
            "{}_{}_{}",
            name, timestamp_millis, self.next_sequence
        ))
    }

    pub(crate) fn position(&self, id: &DocumentId) -> Option<usize> {
        self.documents
            .iter()
            .position(|doc| doc.id() == id.as_str())
    }

    // The sequence keeps counting so ids from before a clear are never reissued.
    fn clear(&mut self) {
        self.documents.clear();
    }
}

pub(crate) type SharedCollection = Arc<RwLock<Collection>>;

/// Process-wide map of collection name -> shared collection.
///
/// Cloning the registry yields another handle to the same collections. Every
/// store built from it with the same name works on the same documents.
#[derive(Debug, Clone, Default)]
pub struct CollectionRegistry {
    // Collection Name -> Collection
    collections: Arc<DashMap<String, SharedCollection>>,
}

impl CollectionRegistry {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(DashMap::new()),
        }
    }

    /// Gets the named collection, creating it on first use.
    pub(crate) fn collection(&self, name: &str) -> SharedCollection {
        self.collections
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(collection = %name, "Creating in-memory collection");
                Arc::new(RwLock::new(Collection::default()))
            })
            .value()
            .clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    /// Collection names in alphabetical order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Number of stored documents, soft-deleted included. Zero for unknown names.
    pub async fn document_count(&self, name: &str) -> usize {
        // Clone the Arc out so no map guard is held across the await.
        let collection = self.collections.get(name).map(|entry| entry.value().clone());
        match collection {
            Some(collection) => collection.read().await.documents.len(),
            None => 0,
        }
    }

    /// Empties every collection in place; existing store handles stay bound.
    pub async fn reset(&self) {
        let collections: Vec<SharedCollection> = self
            .collections
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        debug!(count = collections.len(), "Resetting in-memory collections");
        for collection in collections {
            collection.write().await.clear();
        }
    }
}
