use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use crate::{
    errors::{ApiError, CommonError},
    services::session::SessionState,
    setup::AppState,
};

#[derive(Debug, Serialize)]
pub struct RouteOutput {
    authenticated: bool,
    username: Option<String>,
}

pub async fn session_status(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<RouteOutput>, ApiError<CommonError>> {
    let session = state
        .sessions
        .current(&jar)
        .await
        .map_err(|error| ApiError(CommonError::Database(error)))?;

    let session_state = session
        .as_ref()
        .map(|session| session.state())
        .unwrap_or(SessionState::Anonymous);

    let output = match (session_state, session) {
        (SessionState::Authenticated { .. }, Some(session)) => RouteOutput {
            authenticated: true,
            username: session.username().map(str::to_string),
        },
        _ => RouteOutput {
            authenticated: false,
            username: None,
        },
    };

    Ok(Json(output))
}
