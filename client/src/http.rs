//! `BookSource` over the booktable-server HTTP API.

use crate::error::{ClientError, Result};
use crate::source::BookSource;
use async_trait::async_trait;
use booktable_engine::{Book, BulkUpdateResult, ImportSummary, Page, PageParams, PageRequest};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;

/// Body of `GET /books`.
#[derive(Debug, Deserialize)]
struct ListResponse {
    books: Vec<Book>,
    total: u64,
}

/// Body of a non-2xx response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    modified_count: Option<u64>,
}

/// Talks to a running server at `base_url`.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Turn a non-success status into an error, using the server's `error`
/// message when the body has one.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await?;
    Err(status_error(status.as_u16(), text))
}

/// A body carrying `modifiedCount` is a partially applied bulk update.
fn status_error(status: u16, text: String) -> ClientError {
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(ErrorBody {
            error,
            details,
            modified_count: Some(modified_count),
        }) => ClientError::PartialSave {
            modified_count,
            message: details.unwrap_or(error),
        },
        Ok(body) => ClientError::Status {
            status,
            message: body.error,
        },
        Err(_) => ClientError::Status {
            status,
            message: text,
        },
    }
}

#[async_trait]
impl BookSource for HttpSource {
    async fn list_page(&self, request: &PageRequest) -> Result<Page> {
        let response = self
            .client
            .get(self.url("/books"))
            .query(&PageParams::from(request))
            .send()
            .await?;
        let body: ListResponse = check(response).await?.json().await?;
        Ok(Page {
            records: body.books,
            total: body.total,
        })
    }

    async fn save_changes(&self, changes: &[Book]) -> Result<BulkUpdateResult> {
        let response = self
            .client
            .put(self.url("/books"))
            .json(changes)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn import_csv(&self, bytes: Vec<u8>) -> Result<ImportSummary> {
        let part = Part::bytes(bytes)
            .file_name("books.csv")
            .mime_str("text/csv")?;
        let response = self
            .client
            .post(self.url("/books/upload"))
            .multipart(Form::new().part("file", part))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }
}
