use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::Error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            Error::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            Error::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Error::SubscriptionInactive => (StatusCode::FORBIDDEN, "subscription_inactive"),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            Error::Rejected { status, .. } => (
                *status,
                match *status {
                    StatusCode::PAYLOAD_TOO_LARGE => "payload_too_large",
                    StatusCode::UNSUPPORTED_MEDIA_TYPE => "unsupported_media_type",
                    _ => "bad_request",
                },
            ),
            Error::Database(_) | Error::Storage(_) | Error::Telegram(_) => {
                (StatusCode::BAD_GATEWAY, "upstream_failure")
            }
        };

        let message = if self.is_upstream() {
            log::error!("Upstream failure while serving the panel: {self}");
            "Something went wrong, try again later.".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse { error, message })).into_response()
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        match rejection.status() {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Error::Validation(rejection.body_text())
            }
            status => Error::Rejected {
                status,
                message: rejection.body_text(),
            },
        }
    }
}
