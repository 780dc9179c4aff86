use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use launchpad_types::api::ErrorBody;

/// Every failure a handler can return. Converted to a `{success: false,
/// message}` body at the handler boundary.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} is required")]
    MissingRequiredField(&'static str),

    #[error("Message text cannot be empty")]
    EmptyText,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Authentication required")]
    Unauthorized,

    #[error("You are not allowed to {0}")]
    Forbidden(&'static str),

    #[error("User not found")]
    UserNotFound,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("An account with this email already exists")]
    DuplicateEmail,

    #[error("{0}")]
    Conflict(String),

    #[error("Uploaded file is too large")]
    PayloadTooLarge,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::MissingRequiredField(_) | Self::EmptyText => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidCredentials | Self::InvalidToken | Self::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::UserNotFound | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateEmail | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details stay in the log
        let message = match &self {
            Self::Internal(e) => {
                error!("Request failed: {:#}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorBody::new(message))).into_response()
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge
        } else {
            Self::Validation(err.body_text())
        }
    }
}
