//! In-memory repository over the engine's `MemoryStore`.

use super::BookRepository;
use crate::error::Result;
use async_trait::async_trait;
use booktable_engine::{
    query, Book, BookFields, BulkUpdateResult, MemoryStore, Page, PageRequest, SearchFilter, Sort,
};
use tokio::sync::RwLock;

/// Books held in process memory. Lost on restart.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    store: RwLock<MemoryStore>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing records.
    pub fn with_records(records: impl IntoIterator<Item = Book>) -> Self {
        Self {
            store: RwLock::new(MemoryStore::from_records(records)),
        }
    }
}

#[async_trait]
impl BookRepository for MemoryRepository {
    async fn replace_all(&self, rows: Vec<BookFields>) -> Result<u64> {
        let mut store = self.store.write().await;
        Ok(store.replace_all(rows).len() as u64)
    }

    async fn count(&self, filter: &SearchFilter) -> Result<u64> {
        Ok(self.store.read().await.count(filter))
    }

    async fn find(
        &self,
        filter: &SearchFilter,
        sort: Option<Sort>,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Book>> {
        Ok(self.store.read().await.find(filter, sort, skip, limit))
    }

    async fn bulk_update_by_id(&self, updates: &[Book]) -> Result<BulkUpdateResult> {
        Ok(self.store.write().await.bulk_update_by_id(updates))
    }

    async fn delete_all(&self) -> Result<u64> {
        Ok(self.store.write().await.delete_all())
    }

    // count and find under one read guard, so a concurrent import cannot
    // land between them
    async fn query(&self, request: &PageRequest) -> Result<Page> {
        let store = self.store.read().await;
        Ok(query::run(store.records(), request))
    }
}
