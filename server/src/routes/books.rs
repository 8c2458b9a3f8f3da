//! Book table routes.

use axum::{
    body::Bytes,
    extract::{Multipart, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use booktable_engine::{Book, BulkUpdateResult, ImportSummary, PageParams};

use crate::error::{AppError, Result};
use crate::handlers::{self, DeleteResponse, ListResponse};
use crate::AppState;

/// Create book routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/books",
            get(list_handler).put(save_handler).delete(delete_handler),
        )
        .route("/books/upload", post(upload_handler))
        .route("/books/import", post(import_handler))
        .route("/books/export", get(export_handler))
}

/// GET /books - One page of records plus the total.
async fn list_handler(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<ListResponse>> {
    let response =
        handlers::list_page(state.repo.as_ref(), params, state.config.max_page_size).await?;
    Ok(Json(response))
}

/// PUT /books - Bulk update by id.
async fn save_handler(
    State(state): State<AppState>,
    Json(changes): Json<Vec<Book>>,
) -> Result<Json<BulkUpdateResult>> {
    let result = handlers::save_changes(state.repo.as_ref(), changes).await?;
    Ok(Json(result))
}

/// POST /books/upload - Multipart upload, CSV in the `file` field.
async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImportSummary>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        check_size(&bytes, state.config.max_upload_bytes)?;
        let summary = handlers::import_csv(state.repo.as_ref(), &bytes).await?;
        return Ok(Json(summary));
    }

    Err(AppError::BadRequest("missing multipart field 'file'".to_string()))
}

/// POST /books/import - Raw CSV body.
async fn import_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ImportSummary>> {
    check_size(&body, state.config.max_upload_bytes)?;
    let summary = handlers::import_csv(state.repo.as_ref(), &body).await?;
    Ok(Json(summary))
}

/// GET /books/export - The queried page as CSV.
async fn export_handler(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse> {
    let csv =
        handlers::export_csv(state.repo.as_ref(), params, state.config.max_page_size).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"books.csv\""),
        ],
        csv,
    ))
}

/// DELETE /books - Remove every record.
async fn delete_handler(State(state): State<AppState>) -> Result<Json<DeleteResponse>> {
    let response = handlers::delete_all(state.repo.as_ref()).await?;
    Ok(Json(response))
}

fn check_size(bytes: &[u8], max: usize) -> Result<()> {
    if bytes.len() > max {
        return Err(AppError::PayloadTooLarge(max));
    }
    Ok(())
}
