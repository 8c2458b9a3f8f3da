//! Queries against the `books` table.
//!
//! Text sorts use the "C" collation so ordering is bytewise, matching the
//! in-memory store. `seq` breaks ties and orders unsorted queries.

use booktable_engine::{Book, BookFields, BulkUpdateResult, Field, SearchFilter, Sort, SortDir};
use sqlx::{PgPool, Row};
use std::collections::HashSet;

/// A stored book row from the database.
#[derive(Debug)]
pub struct StoredBook {
    pub id: String,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub published_year: Option<i64>,
    pub isbn: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredBook {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredBook {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            genre: row.try_get("genre")?,
            published_year: row.try_get("published_year")?,
            isbn: row.try_get("isbn")?,
        })
    }
}

impl StoredBook {
    /// Convert database row to an engine record.
    pub fn into_book(self) -> Book {
        Book::new(
            self.id,
            BookFields {
                title: self.title,
                author: self.author,
                genre: self.genre,
                published_year: self.published_year,
                isbn: self.isbn,
            },
        )
    }
}

// $1 is the search text; an empty string matches every row.
const SEARCH_CLAUSE: &str = r#"
    ($1 = ''
     OR strpos(lower(title), lower($1)) > 0
     OR strpos(lower(author), lower($1)) > 0
     OR strpos(lower(genre), lower($1)) > 0
     OR strpos(lower(isbn), lower($1)) > 0)
"#;

fn column(field: Field) -> &'static str {
    match field {
        Field::Title => "title",
        Field::Author => "author",
        Field::Genre => "genre",
        Field::PublishedYear => "published_year",
        Field::Isbn => "isbn",
    }
}

fn order_clause(sort: Option<Sort>) -> String {
    let Some(sort) = sort else {
        return "ORDER BY seq ASC".to_string();
    };
    let key = if sort.field.is_text() {
        format!("{} COLLATE \"C\"", column(sort.field))
    } else {
        column(sort.field).to_string()
    };
    let dir = match sort.dir {
        SortDir::Asc => "ASC NULLS FIRST",
        SortDir::Desc => "DESC NULLS LAST",
    };
    format!("ORDER BY {} {}, seq ASC", key, dir)
}

/// Delete every row and insert `rows` in one transaction.
pub async fn replace_all(pool: &PgPool, rows: Vec<BookFields>) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM books").execute(&mut *tx).await?;

    let mut inserted = 0u64;
    for fields in rows {
        let book = Book::with_new_id(fields);
        sqlx::query(
            r#"
            INSERT INTO books (id, title, author, genre, published_year, isbn)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&book.id)
        .bind(&book.fields.title)
        .bind(&book.fields.author)
        .bind(&book.fields.genre)
        .bind(book.fields.published_year)
        .bind(&book.fields.isbn)
        .execute(&mut *tx)
        .await?;
        inserted += 1;
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Count rows matching the search filter.
pub async fn count_books(pool: &PgPool, filter: &SearchFilter) -> Result<u64, sqlx::Error> {
    let sql = format!("SELECT COUNT(*) FROM books WHERE {}", SEARCH_CLAUSE);
    let result: (i64,) = sqlx::query_as(&sql)
        .bind(filter.text())
        .fetch_one(pool)
        .await?;

    Ok(result.0.max(0) as u64)
}

/// Fetch one ordered slice of matching rows.
pub async fn find_books(
    pool: &PgPool,
    filter: &SearchFilter,
    sort: Option<Sort>,
    skip: u64,
    limit: u64,
) -> Result<Vec<Book>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT id, title, author, genre, published_year, isbn
        FROM books
        WHERE {}
        {}
        LIMIT $2 OFFSET $3
        "#,
        SEARCH_CLAUSE,
        order_clause(sort)
    );

    let rows = sqlx::query_as::<_, StoredBook>(&sql)
        .bind(filter.text())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(skip).unwrap_or(i64::MAX))
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(StoredBook::into_book).collect())
}

/// Which of `ids` exist.
pub async fn existing_ids(pool: &PgPool, ids: &[String]) -> Result<HashSet<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT id FROM books WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Updates whose id exists. A repeated id counts once per update.
pub fn count_matched(updates: &[Book], existing: &HashSet<String>) -> u64 {
    updates
        .iter()
        .filter(|book| existing.contains(&book.id))
        .count() as u64
}

/// Overwrite one row by id. Returns whether a stored value changed.
pub async fn update_book(pool: &PgPool, book: &Book) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE books
        SET title = $2, author = $3, genre = $4, published_year = $5, isbn = $6
        WHERE id = $1
          AND (title, author, genre, published_year, isbn)
              IS DISTINCT FROM ($2, $3, $4, $5, $6)
        "#,
    )
    .bind(&book.id)
    .bind(&book.fields.title)
    .bind(&book.fields.author)
    .bind(&book.fields.genre)
    .bind(book.fields.published_year)
    .bind(&book.fields.isbn)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete every row. Returns how many were removed.
pub async fn delete_all_books(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM books").execute(pool).await?;
    Ok(result.rows_affected())
}

/// Apply updates one by one without a transaction.
///
/// Stops at the first failing statement and reports how many rows had been
/// modified before it.
pub async fn bulk_update(
    pool: &PgPool,
    updates: &[Book],
) -> Result<BulkUpdateResult, (u64, sqlx::Error)> {
    let ids: Vec<String> = updates.iter().map(|book| book.id.clone()).collect();
    let existing = existing_ids(pool, &ids).await.map_err(|e| (0, e))?;
    let matched_count = count_matched(updates, &existing);

    let mut modified_count = 0u64;
    for book in updates {
        match update_book(pool, book).await {
            Ok(true) => modified_count += 1,
            Ok(false) => {}
            Err(e) => return Err((modified_count, e)),
        }
    }

    Ok(BulkUpdateResult {
        matched_count,
        modified_count,
    })
}
