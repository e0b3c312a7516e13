use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors raised by the chat store, the connection registry and the HTTP layer.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("could not get a database connection: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("connection registry lock poisoned")]
    LockPoisoned,
}

impl From<validator::ValidationErrors> for ChatError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ChatError::Validation(errors.to_string())
    }
}

impl ChatError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ChatError::NotFound(_) => StatusCode::NOT_FOUND,
            ChatError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ChatError::Validation(_) => StatusCode::BAD_REQUEST,
            ChatError::Unauthorized => StatusCode::UNAUTHORIZED,
            ChatError::Database(_) | ChatError::Pool(_) | ChatError::LockPoisoned => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal error: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_status_codes() {
        assert_eq!(ChatError::NotFound("room".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ChatError::PermissionDenied("room".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ChatError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ChatError::LockPoisoned.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_message_names_the_entity() {
        assert_eq!(ChatError::NotFound("Room".into()).to_string(), "Room not found");
    }
}
