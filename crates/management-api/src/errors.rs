//! Error responses.
//!
//! Every failure is answered with a JSON array of
//! `{"message": .., "type": ..}` objects.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use spi::ServiceError;
use tracing::error;

/// One entry of an error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A handler failure, rendered as status code plus [`ErrorDetail`] body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    detail: ErrorDetail,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            detail: ErrorDetail {
                message: message.into(),
                kind: kind.to_owned(),
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "InvalidRequest", message)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "NotAuthorized",
            "Request could not be authenticated",
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(message) => {
                Self::new(StatusCode::NOT_FOUND, "ObjectNotFound", message)
            }
            ServiceError::Conflict(message) => {
                Self::new(StatusCode::CONFLICT, "ObjectConflict", message)
            }
            ServiceError::BadRequest(message) => Self::bad_request(message),
            ServiceError::Unexpected(message) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Unexpected", message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(
                status = %self.status,
                message = %self.detail.message,
                "Management request failed"
            );
        }
        (self.status, Json(vec![self.detail])).into_response()
    }
}
