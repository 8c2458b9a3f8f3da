//! Where pages come from and where saves go.

use crate::error::Result;
use async_trait::async_trait;
use booktable_engine::{Book, BulkUpdateResult, ImportSummary, Page, PageRequest};

/// Remote record store as seen by the controller.
#[async_trait]
pub trait BookSource: Send + Sync + 'static {
    /// Fetch one page and the total matching count.
    async fn list_page(&self, request: &PageRequest) -> Result<Page>;

    /// Send a changeset as one bulk update.
    async fn save_changes(&self, changes: &[Book]) -> Result<BulkUpdateResult>;

    /// Replace the whole store with a CSV upload.
    async fn import_csv(&self, bytes: Vec<u8>) -> Result<ImportSummary>;
}
