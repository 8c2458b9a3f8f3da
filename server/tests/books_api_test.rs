//! Integration tests for the book table HTTP API.
//!
//! The router runs against the in-memory repository, so no database is
//! needed.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use booktable_engine::{Book, BookFields};
use booktable_server::config::Config;
use booktable_server::repository::MemoryRepository;
use booktable_server::{app, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Test helper to build a router over the given records.
fn test_app(records: Vec<Book>) -> Router {
    test_app_with_config(records, Config::default())
}

fn test_app_with_config(records: Vec<Book>, config: Config) -> Router {
    let repo = Arc::new(MemoryRepository::with_records(records));
    app(AppState::new(repo, config))
}

fn book(id: &str, title: &str, year: Option<i64>) -> Book {
    Book::new(
        id,
        BookFields {
            title: title.into(),
            published_year: year,
            ..Default::default()
        },
    )
}

fn two_books() -> Vec<Book> {
    vec![book("1", "A", Some(1990)), book("2", "B", Some(2000))]
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_str(&body).unwrap())
}

fn book_ids(body: &Value) -> Vec<String> {
    body["books"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_str().unwrap().to_string())
        .collect()
}

fn raw_import(csv: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/books/import")
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(csv.to_string()))
        .unwrap()
}

#[cfg(test)]
mod list_tests {
    use super::*;

    #[tokio::test]
    async fn test_health() {
        let app = test_app(vec![]);
        let (status, body) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_sort_by_year_desc() {
        let app = test_app(two_books());
        let (status, body) =
            get_json(&app, "/books?page=1&limit=10&sortKey=publishedYear&sortDir=desc").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(book_ids(&body), vec!["2", "1"]);
        assert_eq!(body["total"], 2);
    }

    #[tokio::test]
    async fn test_books_are_flat_camel_case() {
        let app = test_app(two_books());
        let (_, body) = get_json(&app, "/books?limit=1").await;
        assert_eq!(
            body["books"][0],
            json!({
                "id": "1",
                "title": "A",
                "author": "",
                "genre": "",
                "publishedYear": 1990,
                "isbn": ""
            })
        );
    }

    #[tokio::test]
    async fn test_search_without_match() {
        let app = test_app(two_books());
        let (status, body) = get_json(&app, "/books?q=xyz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"books": [], "total": 0}));
    }

    #[tokio::test]
    async fn test_out_of_range_params_are_clamped() {
        let app = test_app(two_books());
        let (status, body) = get_json(&app, "/books?page=0&limit=-5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(book_ids(&body), vec!["1"]);
        assert_eq!(body["total"], 2);
    }

    #[tokio::test]
    async fn test_limit_is_capped_by_config() {
        let records = (0..5).map(|i| book(&i.to_string(), "t", None)).collect();
        let config = Config {
            max_page_size: 3,
            ..Config::default()
        };
        let app = test_app_with_config(records, config);
        let (_, body) = get_json(&app, "/books?limit=100").await;
        assert_eq!(book_ids(&body).len(), 3);
        assert_eq!(body["total"], 5);
    }

    #[tokio::test]
    async fn test_unknown_sort_key() {
        let app = test_app(two_books());
        let (status, body) = get_json(&app, "/books?sortKey=price").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "unknown field: price");
    }
}

#[cfg(test)]
mod save_tests {
    use super::*;

    fn put_books(body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::PUT)
            .uri("/books")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_bulk_update_then_refetch() {
        let app = test_app(two_books());
        let changes = json!([{
            "id": "1",
            "title": "A revised",
            "author": "",
            "genre": "",
            "publishedYear": 1990,
            "isbn": ""
        }]);

        let (status, body) = send(&app, put_books(changes)).await;
        assert_eq!(status, StatusCode::OK);
        let result: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(result, json!({"matchedCount": 1, "modifiedCount": 1}));

        let (_, page) = get_json(&app, "/books").await;
        assert_eq!(page["books"][0]["title"], "A revised");
        assert_eq!(page["books"][1]["title"], "B");
    }

    #[tokio::test]
    async fn test_unknown_ids_are_skipped() {
        let app = test_app(two_books());
        let changes = json!([{"id": "gone", "title": "X"}]);

        let (status, body) = send(&app, put_books(changes)).await;
        assert_eq!(status, StatusCode::OK);
        let result: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(result, json!({"matchedCount": 0, "modifiedCount": 0}));
    }

    #[tokio::test]
    async fn test_empty_changeset() {
        let app = test_app(two_books());
        let (status, body) = send(&app, put_books(json!([]))).await;
        assert_eq!(status, StatusCode::OK);
        let result: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(result["modifiedCount"], 0);
    }
}

#[cfg(test)]
mod import_tests {
    use super::*;

    #[tokio::test]
    async fn test_raw_import_replaces_store() {
        let app = test_app(two_books());
        let (status, body) = send(&app, raw_import("Title,PublishedYear\nX,2005\n")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"insertedCount":1}"#);

        let (_, page) = get_json(&app, "/books").await;
        assert_eq!(page["total"], 1);
        assert_eq!(page["books"][0]["title"], "X");
        assert_eq!(page["books"][0]["author"], "");
        assert_eq!(page["books"][0]["publishedYear"], 2005);
    }

    #[tokio::test]
    async fn test_multipart_upload() {
        let app = test_app(vec![]);
        let boundary = "booktable-boundary";
        let body = format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"books.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             title,author\nDune,Herbert\nEmma,Austen\n\r\n\
             --{b}--\r\n",
            b = boundary
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/books/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"insertedCount":2}"#);
    }

    #[tokio::test]
    async fn test_header_only_upload_is_rejected() {
        let app = test_app(two_books());
        let (status, _) = send(&app, raw_import("Title,Author\n")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, page) = get_json(&app, "/books").await;
        assert_eq!(page["total"], 2);
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let config = Config {
            max_upload_bytes: 16,
            ..Config::default()
        };
        let app = test_app_with_config(two_books(), config);
        let (status, _) = send(&app, raw_import("title\nsomething quite long\n")).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        let (_, page) = get_json(&app, "/books").await;
        assert_eq!(page["total"], 2);
    }
}

#[cfg(test)]
mod export_tests {
    use super::*;

    #[tokio::test]
    async fn test_export_queried_page() {
        let app = test_app(two_books());
        let request = Request::builder()
            .uri("/books/export?sortKey=title&sortDir=desc")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            "title,author,genre,publishedYear,isbn\nB,,,2000,\nA,,,1990,\n"
        );
    }

    #[tokio::test]
    async fn test_delete_all() {
        let app = test_app(two_books());
        let request = Request::builder()
            .method(Method::DELETE)
            .uri("/books")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"deletedCount":2}"#);

        let (_, page) = get_json(&app, "/books").await;
        assert_eq!(page["total"], 0);
    }
}
