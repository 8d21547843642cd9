use axum::{extract::State, response::Redirect};
use axum_extra::extract::cookie::CookieJar;
use tracing::{error, info};

use crate::{services::database::DatabaseError, setup::AppState};

/// Always ends in a redirect. Cookies are cleared even when the server side
/// cleanup fails.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    match attempt_logout(&state, jar.clone()).await {
        Ok(jar) => (jar, Redirect::to(&state.settings.landing_page)),
        Err(error) => {
            error!(%error, "logout failed");

            let jar = jar
                .add(state.sessions.removal_cookie())
                .add(state.remember_me.removal_cookie());

            (jar, Redirect::to(&state.settings.error_page))
        }
    }
}

async fn attempt_logout(state: &AppState, jar: CookieJar) -> Result<CookieJar, DatabaseError> {
    if let Some(session) = state.sessions.current(&jar).await? {
        if let Some(user_id) = session.user_id() {
            state.remember_me.revoke(user_id.to_string()).await?;
            info!(user_id, "user logged out");
        }
    }

    let jar = state.sessions.destroy(jar).await?;

    Ok(jar.add(state.remember_me.removal_cookie()))
}
