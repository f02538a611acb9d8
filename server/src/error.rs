//! HTTP error responses
//!
//! Every failure leaves the server as `{"error": "<message>"}`. User mistakes
//! echo their message; internal faults are logged in full and answered with
//! an opaque message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use plant_diagnosis::DiagnosisError;

pub const NO_FILE: &str = "No file uploaded";
pub const EMPTY_FILENAME: &str = "Empty filename";
pub const INVALID_MULTIPART: &str = "Invalid multipart request";
pub const UPLOAD_TOO_LARGE: &str = "Upload too large";
pub const INTERNAL: &str = "Internal server error";
pub const TIMED_OUT: &str = "Prediction timed out";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<DiagnosisError> for ApiError {
    fn from(err: DiagnosisError) -> Self {
        match err {
            e if e.is_user_error() => ApiError::bad_request(e.to_string()),
            DiagnosisError::Timeout(after) => {
                error!("Prediction abandoned after {:?}", after);
                ApiError::new(StatusCode::GATEWAY_TIMEOUT, TIMED_OUT)
            }
            e => {
                error!("Prediction failed: {}", e);
                ApiError::internal()
            }
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        tracing::debug!("Rejected multipart body: {}", err);
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, UPLOAD_TOO_LARGE)
        } else {
            ApiError::bad_request(INVALID_MULTIPART)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}
