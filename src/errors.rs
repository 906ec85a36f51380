use crate::services::drive_service::DriveError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// Shortcut for a 401 Unauthorized
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    /// Shortcut for a 403 Forbidden
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

/// Map service failures onto the HTTP taxonomy: invalid input is 400, a
/// missing or foreign-owned entry is 404, everything unexpected is 500 with
/// the detail logged rather than returned.
impl From<DriveError> for AppError {
    fn from(err: DriveError) -> Self {
        match err {
            DriveError::NameRequired
            | DriveError::EmptyPayload
            | DriveError::UnsupportedMediaType(_)
            | DriveError::ParentNotFound
            | DriveError::FolderCycle
            | DriveError::NotTrashed => AppError::bad_request(err.to_string()),
            DriveError::EntryNotFound => AppError::not_found(err.to_string()),
            DriveError::Sqlx(inner) => {
                tracing::error!("database failure: {}", inner);
                AppError::internal("internal storage failure")
            }
            DriveError::Media(inner) => {
                tracing::error!("media backend failure: {}", inner);
                AppError::internal("media storage failure")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{drive_service::DriveError, media_service::MediaError};

    #[test]
    fn validation_failures_map_to_bad_request() {
        for err in [
            DriveError::NameRequired,
            DriveError::EmptyPayload,
            DriveError::UnsupportedMediaType("text/plain".into()),
            DriveError::ParentNotFound,
            DriveError::FolderCycle,
            DriveError::NotTrashed,
        ] {
            let mapped = AppError::from(err);
            assert_eq!(mapped.status, StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn missing_entries_map_to_not_found() {
        let mapped = AppError::from(DriveError::EntryNotFound);
        assert_eq!(mapped.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn backend_failures_hide_details() {
        let mapped = AppError::from(DriveError::Sqlx(sqlx::Error::PoolClosed));
        assert_eq!(mapped.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(mapped.message, "internal storage failure");

        let mapped = AppError::from(DriveError::Media(MediaError::InvalidPath));
        assert_eq!(mapped.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(mapped.message, "media storage failure");
    }
}
