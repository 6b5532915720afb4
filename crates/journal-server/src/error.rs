//! Mapping of workflow failures onto HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use journal_core::{ErrorKind, JournalError};

/// Errors returned by handlers
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or malformed actor headers
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Journal(#[from] JournalError),
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// HTTP status for an error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Conflict | ErrorKind::DuplicateInvitation | ErrorKind::DuplicateDoi => {
            StatusCode::CONFLICT
        }
        ErrorKind::InvalidTransition
        | ErrorKind::MissingManuscript
        | ErrorKind::ArticleLocked
        | ErrorKind::AlreadyResponded
        | ErrorKind::NotAccepted
        | ErrorKind::InvalidReminderState
        | ErrorKind::AlreadyPublished
        | ErrorKind::EmptyIssue
        | ErrorKind::ArticlesNotReady
        | ErrorKind::IssueLocked => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Validation | ErrorKind::MissingReason | ErrorKind::MissingRecommendation => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "UNAUTHORIZED",
                    message,
                    details: None,
                },
            ),
            ApiError::Journal(err) => {
                let kind = err.kind();
                let message = if kind == ErrorKind::Internal {
                    // Storage detail stays in the log
                    tracing::error!(error = %err, "internal error");
                    "Internal error".to_string()
                } else {
                    err.to_string()
                };
                (
                    status_for(kind),
                    ErrorBody {
                        code: kind.code(),
                        message,
                        details: err.details(),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use journal_core::error::PersistenceError;

    #[test]
    fn test_lifecycle_errors_are_unprocessable() {
        assert_eq!(
            status_for(ErrorKind::InvalidTransition),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_for(ErrorKind::DuplicateDoi), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::MissingReason), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let err: ApiError =
            JournalError::from(PersistenceError::Database("table articles is locked".into())).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
