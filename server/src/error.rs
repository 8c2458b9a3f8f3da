//! Unified error handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use booktable_engine::ErrorKind;
use serde::Serialize;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] booktable_engine::Error),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Upload too large: limit is {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    /// Rows written before a bulk update stopped
    #[serde(skip_serializing_if = "Option::is_none")]
    modified_count: Option<u64>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                    None,
                )
            }
            AppError::Engine(e) => match e.kind() {
                ErrorKind::Import | ErrorKind::Fetch | ErrorKind::Edit => {
                    tracing::warn!("Rejected request: {}", e);
                    (StatusCode::BAD_REQUEST, e.to_string(), None)
                }
                ErrorKind::Save | ErrorKind::Export => {
                    tracing::error!("Engine error: {:?}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Save failed".to_string(),
                        Some(e.to_string()),
                    )
                }
            },
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::PayloadTooLarge(_) => {
                (StatusCode::PAYLOAD_TOO_LARGE, self.to_string(), None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    Some(msg.clone()),
                )
            }
        };

        let modified_count = match &self {
            AppError::Engine(booktable_engine::Error::PartialUpdate { modified, .. }) => {
                Some(*modified)
            }
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
            modified_count,
        });

        (status, body).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use booktable_engine::Error;

    #[test]
    fn engine_rejections_are_bad_requests() {
        let response = AppError::from(Error::EmptyImport).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::from(Error::UnknownField("price".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn partial_update_reports_modified_count() {
        let err = Error::PartialUpdate {
            modified: 2,
            message: "connection reset".into(),
        };
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Save failed");
        assert_eq!(body["modifiedCount"], 2);
    }

    #[tokio::test]
    async fn other_errors_omit_modified_count() {
        let response = AppError::from(Error::EmptyImport).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body.get("modifiedCount").is_none());
    }

    #[test]
    fn oversized_upload_status() {
        let response = AppError::PayloadTooLarge(10).into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
