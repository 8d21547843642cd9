pub mod auth;
pub mod health;

use axum::{routing::get, Router};
use serde::de::DeserializeOwned;

use crate::{
    errors::{ApiError, CommonError},
    setup::AppState,
    utils::validation::FieldError,
};

/// Answers any method a route does not list.
pub async fn method_not_allowed() -> ApiError<CommonError> {
    ApiError(CommonError::MethodNotAllowed)
}

/// Decodes an `application/x-www-form-urlencoded` body.
pub(crate) fn decode_form<T: DeserializeOwned>(body: &[u8]) -> Result<T, FieldError> {
    serde_urlencoded::from_bytes(body).map_err(|_| FieldError::new("body", "Malformed form body"))
}

// Main router that serves as the entry point for all routes
pub fn main_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::auth_router())
        .route("/health", get(health::health))
}
