//! Book handlers - listing, saving, importing and exporting.

use crate::error::Result;
use crate::repository::BookRepository;
use booktable_engine::{Book, BulkUpdateResult, ImportBatch, ImportSummary, PageParams};
use serde::{Deserialize, Serialize};

/// Response for a page listing.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    /// Records on the requested page
    pub books: Vec<Book>,
    /// Matching records across all pages
    pub total: u64,
}

/// Response for delete-all.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub deleted_count: u64,
}

/// Serve one page of records.
pub async fn list_page(
    repo: &dyn BookRepository,
    params: PageParams,
    max_page_size: u64,
) -> Result<ListResponse> {
    let request = params.into_request(max_page_size)?;
    let page = repo.query(&request).await?;

    tracing::debug!(
        page = request.page(),
        limit = request.limit(),
        returned = page.records.len(),
        total = page.total,
        "Served page"
    );

    Ok(ListResponse {
        books: page.records,
        total: page.total,
    })
}

/// Apply a changeset. An empty changeset touches nothing.
pub async fn save_changes(
    repo: &dyn BookRepository,
    changes: Vec<Book>,
) -> Result<BulkUpdateResult> {
    if changes.is_empty() {
        return Ok(BulkUpdateResult::default());
    }

    let result = repo.bulk_update_by_id(&changes).await?;
    if result.matched_count < changes.len() as u64 {
        tracing::warn!(
            "Bulk update matched {} of {} record(s)",
            result.matched_count,
            changes.len()
        );
    }
    tracing::info!(
        matched = result.matched_count,
        modified = result.modified_count,
        "Saved changes"
    );

    Ok(result)
}

/// Validate an upload, then replace the whole store with it.
pub async fn import_csv(repo: &dyn BookRepository, bytes: &[u8]) -> Result<ImportSummary> {
    // nothing is written unless the whole upload validates
    let batch = ImportBatch::prepare(bytes)?;
    let previous = repo.count(&Default::default()).await?;

    let inserted_count = repo.replace_all(batch.into_rows()).await?;
    tracing::warn!(
        "Import replaced {} record(s) with {} new record(s)",
        previous,
        inserted_count
    );

    Ok(ImportSummary { inserted_count })
}

/// Query a page and render it as CSV.
pub async fn export_csv(
    repo: &dyn BookRepository,
    params: PageParams,
    max_page_size: u64,
) -> Result<String> {
    let request = params.into_request(max_page_size)?;
    let page = repo.query(&request).await?;
    Ok(booktable_engine::to_csv(&page.records)?)
}

/// Remove every record.
pub async fn delete_all(repo: &dyn BookRepository) -> Result<DeleteResponse> {
    let deleted_count = repo.delete_all().await?;
    tracing::warn!("Deleted all {} record(s)", deleted_count);
    Ok(DeleteResponse { deleted_count })
}
