pub mod memory_storage;
mod query;
pub mod registry;

// Re-export the store and its registry
pub use memory_storage::MemoryStorageService;
pub use registry::CollectionRegistry;
