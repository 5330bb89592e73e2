use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde_json::json;
use thiserror::Error;

use crate::ai::AiError;
use crate::middleware::logging::to_response;
use crate::services::try_on::{ImageError, TryOnError};
use crate::storage::StorageError;

/// Error returned by every handler. The variant decides the status code and
/// whether the text goes out as `message` (client errors) or `error`.
#[derive(Clone, Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Failed to create transaction")]
    TransactionCreationFailed,
    #[error("Database error: {0}")]
    Db(String),
    #[error("AI service error: {0}")]
    Ai(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::TransactionCreationFailed
            | ApiError::Db(_)
            | ApiError::Ai(_)
            | ApiError::Storage(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = if status.is_server_error() {
            json!({ "success": false, "error": self.to_string() })
        } else {
            json!({ "success": false, "message": self.to_string() })
        };

        to_response((status, Json(body)), Err(self))
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        ApiError::Db(err.to_string())
    }
}

impl From<AiError> for ApiError {
    fn from(err: AiError) -> Self {
        ApiError::Ai(err.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Storage(err.to_string())
    }
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Encode(_) => ApiError::Internal(err.to_string()),
            _ => ApiError::Validation(err.to_string()),
        }
    }
}

impl From<TryOnError> for ApiError {
    fn from(err: TryOnError) -> Self {
        match err {
            TryOnError::Ai(err) => err.into(),
            TryOnError::NoImage(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| match &err.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid value for {field}"),
                })
            })
            .collect::<Vec<_>>()
            .join(", ");
        ApiError::Validation(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(ApiError::validation("bad").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::not_found("gone").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn downstream_failures_map_to_500() {
        let err: ApiError = DbErr::Custom("boom".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn bad_uploads_are_client_errors() {
        let err: ApiError = ImageError::UnsupportedFormat.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = TryOnError::NoImage("sorry".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("sorry"));
    }
}
