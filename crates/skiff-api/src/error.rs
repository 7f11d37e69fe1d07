//! API error type and HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use skiff_store::StoreError;

/// Errors returned by the store API handlers.
///
/// Display strings double as the wire-visible `error` body, so they are
/// stable; clients match on `store: key not found`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The `{addr}` path segment is not a valid account hash.
    #[error("account not found")]
    AccountNotFound,

    /// The requested entry (or its account database) is absent.
    #[error("store: key not found")]
    NotFound,

    /// The supplied signature did not verify against the supplied key.
    #[error("store: invalid signature")]
    SignatureInvalid,

    /// The request body was not valid JSON for the expected shape.
    #[error("malformed json: {0}")]
    MalformedBody(String),

    /// A write referenced a parent key with no entry.
    #[error("store: parent not found")]
    ParentNotFound,

    /// The entry's key or parent fields disagreed with the request.
    #[error("store: entry key or parent does not match arguments")]
    KeyFieldMismatch,

    /// Refused to remove an entry that still has children.
    #[error("store: cannot remove a collection with entries")]
    CannotRemoveCollection,

    /// A backend failure on the write path.
    #[error("backend error: {0}")]
    Backend(StoreError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::AccountNotFound | Self::NotFound => StatusCode::NOT_FOUND,
            Self::SignatureInvalid
            | Self::MalformedBody(_)
            | Self::ParentNotFound
            | Self::KeyFieldMismatch
            | Self::CannotRemoveCollection => StatusCode::BAD_REQUEST,
            Self::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound,
            StoreError::ParentNotFound => Self::ParentNotFound,
            StoreError::KeyFieldMismatch => Self::KeyFieldMismatch,
            StoreError::CannotRemoveCollection => Self::CannotRemoveCollection,
            other => Self::Backend(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
