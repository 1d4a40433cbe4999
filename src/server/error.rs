//! HTTP mapping of crate errors.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::error::{CommandError, Error, StorageError};

/// A crate error on its way out as an HTTP response.
///
/// The body is always `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    /// Status code for the wrapped error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Storage(StorageError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Error::Storage(StorageError::InvalidRecord(_))
            | Error::Command(
                CommandError::InvalidArgument(_)
                | CommandError::UnknownAction { .. }
                | CommandError::UnknownKind(_),
            ) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl<E: Into<Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found = ApiError::from(StorageError::NotFound {
            entity: "startup",
            id: "x".to_string(),
        });
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let bad = ApiError::from(CommandError::UnknownKind("weather".to_string()));
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let internal = ApiError::from(StorageError::LockPoisoned);
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
