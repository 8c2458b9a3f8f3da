//! Booktable Server - HTTP service for a paged, editable book table.
//!
//! Serves page queries, bulk saves and CSV import/export on top of the
//! booktable-engine logic, backed by PostgreSQL or an in-memory store.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod repository;
pub mod routes;

use crate::config::Config;
use crate::repository::BookRepository;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn BookRepository>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(repo: Arc<dyn BookRepository>, config: Config) -> Self {
        Self {
            repo,
            config: Arc::new(config),
        }
    }
}

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    // allow multipart framing on top of the largest accepted file
    let body_limit = state.config.max_upload_bytes.saturating_add(64 * 1024);

    Router::new()
        .merge(routes::create_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
