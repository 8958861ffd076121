//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors become a JSON body
//! `{"error": "..."}` with a matching status code.
//!
//! Database and internal errors are logged in full; the client only sees a
//! generic message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use noted_core::NotedError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Propagated from noted-core.
    #[error(transparent)]
    Core(#[from] NotedError),

    /// The caller referenced a resource that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or unknown bearer token.
    #[error("unauthorized")]
    Unauthorized,

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_owned()),
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                internal()
            }
            ServerError::Core(e) => match e {
                NotedError::Validation(m) => (StatusCode::BAD_REQUEST, m.clone()),
                NotedError::NotFound(m) => (StatusCode::NOT_FOUND, format!("{m} not found")),
                NotedError::Unauthenticated => {
                    (StatusCode::UNAUTHORIZED, "unauthorized".to_owned())
                }
                NotedError::Completion(m) => {
                    error!(error = %m, "completion provider error");
                    (StatusCode::BAD_GATEWAY, "completion provider error".to_owned())
                }
                NotedError::Database(_) | NotedError::Migration(_) => {
                    error!(error = %e, "database error");
                    internal()
                }
            },
        }
    }
}

fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal server error".to_owned(),
    )
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = self.status_and_message();
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<validator::ValidationErrors> for ServerError {
    fn from(e: validator::ValidationErrors) -> Self {
        ServerError::BadRequest(e.to_string())
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(e: anyhow::Error) -> Self {
        error!(error = ?e, "converting anyhow error to ServerError::Internal");
        ServerError::Internal(e.to_string())
    }
}
