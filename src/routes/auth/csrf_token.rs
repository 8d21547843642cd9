use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use crate::{
    errors::{ApiError, CommonError},
    setup::AppState,
};

#[derive(Debug, Serialize)]
pub struct RouteOutput {
    csrf_token: String,
}

/// Hands the session's anti-forgery token to the client, starting a session
/// when the request has none.
pub async fn csrf_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<RouteOutput>), ApiError<CommonError>> {
    let session = state
        .sessions
        .start(&jar)
        .await
        .map_err(|error| ApiError(CommonError::Database(error)))?;

    let csrf_token = session.csrf_token().unwrap_or_default().to_string();

    Ok((
        jar.add(state.sessions.cookie(&session)),
        Json(RouteOutput { csrf_token }),
    ))
}
