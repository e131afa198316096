//! Mapping from command failures to HTTP responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use fleet_core::{ApiResponse, CommandError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("Invalid JSON: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Command(err) => {
                let status = match err {
                    CommandError::AccessDenied => StatusCode::FORBIDDEN,
                    CommandError::NotActivated => StatusCode::BAD_REQUEST,
                    CommandError::InvalidState(_) => StatusCode::BAD_REQUEST,
                    CommandError::NotFound(_) => StatusCode::NOT_FOUND,
                    CommandError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            tracing::error!("Command failed: {}", message);
        }
        (status, Json(ApiResponse::<()>::failed(message))).into_response()
    }
}
