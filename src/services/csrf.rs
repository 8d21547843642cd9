use axum::http::HeaderMap;
use tracing::warn;

use crate::{errors::CommonError, services::session::Session, utils::crypto::tokens_match};

pub const CSRF_HEADER: &str = "x-csrf-token";

/// Checks the request header against the token stored in the session.
pub fn verify(session: &Session, headers: &HeaderMap, enabled: bool) -> Result<(), CommonError> {
    if !enabled {
        return Ok(());
    }

    let provided = headers
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    match session.csrf_token() {
        Some(expected) if !provided.is_empty() && tokens_match(expected, provided) => Ok(()),
        _ => {
            warn!("rejected request with missing or mismatched csrf token");
            Err(CommonError::Forbidden)
        }
    }
}
