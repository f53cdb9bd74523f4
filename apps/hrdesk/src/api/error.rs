//! API error type and its JSON rendering.

use super::response::Envelope;
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hrdesk_core::HrError;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Too many attempts, try again later")]
    TooManyRequests,

    /// Logged in full, reported to the client as a generic message.
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            error!(%detail, "request failed");
        }
        let body = Envelope::<()>::failure(self.to_string());
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<HrError> for ApiError {
    fn from(err: HrError) -> Self {
        let message = err.to_string();
        match err {
            HrError::NotFound { .. } => Self::NotFound(message),
            HrError::Conflict(_) => Self::Conflict(message),
            HrError::Validation(_) | HrError::MissingFields(_) | HrError::InvalidResetToken => {
                Self::BadRequest(message)
            }
            HrError::InvalidCredentials | HrError::SessionExpired => Self::Unauthorized(message),
            HrError::Forbidden(_) => Self::Forbidden(message),
            HrError::Storage(_) | HrError::Encoding(_) | HrError::PasswordHash(_) => {
                Self::Internal(message)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(format!("Invalid query: {}", rejection.body_text()))
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(_: jsonwebtoken::errors::Error) -> Self {
        Self::unauthorized("Invalid or expired token")
    }
}
