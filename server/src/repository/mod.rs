//! Record store behind the HTTP layer.
//!
//! Handlers only see [`BookRepository`]; the binary picks PostgreSQL when a
//! database URL is configured and the in-memory store otherwise.

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

use crate::error::Result;
use async_trait::async_trait;
use booktable_engine::{
    Book, BookFields, BulkUpdateResult, Page, PageRequest, SearchFilter, Sort,
};

/// Record store contract: replace-all, count, find, bulk update, delete-all.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Replace every stored record, assigning fresh ids. Returns the number
    /// inserted. Either the whole batch lands or nothing changes.
    async fn replace_all(&self, rows: Vec<BookFields>) -> Result<u64>;

    async fn count(&self, filter: &SearchFilter) -> Result<u64>;

    /// Matching records ordered by `sort` (insertion order when `None`),
    /// with insertion order breaking ties.
    async fn find(
        &self,
        filter: &SearchFilter,
        sort: Option<Sort>,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Book>>;

    /// Overwrite each record's fields by id. Unknown ids are skipped.
    async fn bulk_update_by_id(&self, updates: &[Book]) -> Result<BulkUpdateResult>;

    async fn delete_all(&self) -> Result<u64>;

    /// One page plus the total matching count.
    async fn query(&self, request: &PageRequest) -> Result<Page> {
        let total = self.count(request.filter()).await?;
        let records = self
            .find(request.filter(), request.sort(), request.skip(), request.limit())
            .await?;
        Ok(Page { records, total })
    }
}
