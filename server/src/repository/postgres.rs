//! PostgreSQL repository.

use super::BookRepository;
use crate::db::{self, Pool};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use booktable_engine::{Book, BookFields, BulkUpdateResult, Error, SearchFilter, Sort};

/// Books stored in the `books` table.
#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: Pool,
}

impl PgRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for PgRepository {
    async fn replace_all(&self, rows: Vec<BookFields>) -> Result<u64> {
        Ok(db::replace_all(&self.pool, rows).await?)
    }

    async fn count(&self, filter: &SearchFilter) -> Result<u64> {
        Ok(db::count_books(&self.pool, filter).await?)
    }

    async fn find(
        &self,
        filter: &SearchFilter,
        sort: Option<Sort>,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Book>> {
        Ok(db::find_books(&self.pool, filter, sort, skip, limit).await?)
    }

    async fn bulk_update_by_id(&self, updates: &[Book]) -> Result<BulkUpdateResult> {
        match db::bulk_update(&self.pool, updates).await {
            Ok(result) => Ok(result),
            Err((0, e)) => Err(AppError::Database(e)),
            Err((modified, e)) => {
                tracing::error!("Bulk update stopped after {} row(s): {:?}", modified, e);
                Err(AppError::Engine(Error::PartialUpdate {
                    modified,
                    message: e.to_string(),
                }))
            }
        }
    }

    async fn delete_all(&self) -> Result<u64> {
        Ok(db::delete_all_books(&self.pool).await?)
    }
}
