use std::fmt::Display;

use super::common::CommonError;
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use hyper::StatusCode;
use serde_json::{json, Value};
use tracing::error;

pub trait ErrorResponse {
    fn error_name(&self) -> &str;
    fn error_message(&self) -> Value;
    fn status_code(&self) -> StatusCode;
}

pub struct ApiError<T>(pub T);

impl<T: ErrorResponse + Display> IntoResponse for ApiError<T> {
    fn into_response(self) -> Response {
        let status = self.0.status_code();

        // Clients only ever see the generic message for server faults.
        if status.is_server_error() {
            error!(kind = self.0.error_name(), error = %self.0, "request failed");
        }

        let body = Json(json!({ "error": self.0.error_message() }));
        (status, body).into_response()
    }
}

impl ErrorResponse for CommonError {
    fn error_name(&self) -> &str {
        match self {
            CommonError::Validation(_) => "Validation Error",
            CommonError::Forbidden => "Forbidden",
            CommonError::MethodNotAllowed => "Method Not Allowed",
            CommonError::Database(_) => "Database Error",
            CommonError::Hashing(_) => "Hashing Error",
        }
    }

    fn error_message(&self) -> Value {
        match self {
            CommonError::Validation(error) => json!(error.message),
            CommonError::Forbidden => json!("Invalid CSRF token"),
            CommonError::MethodNotAllowed => json!("Method not allowed"),
            CommonError::Database(_) => json!("Internal server error"),
            CommonError::Hashing(_) => json!("Internal server error"),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            CommonError::Validation(_) => StatusCode::BAD_REQUEST,
            CommonError::Forbidden => StatusCode::FORBIDDEN,
            CommonError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            CommonError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CommonError::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
