use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::{
    errors::{ApiError, SigninError},
    routes::decode_form,
    services::{csrf, session::Session},
    setup::AppState,
    utils::validation::{
        first_field_error, parse_flag, validate_password_present, validate_username, FieldError,
    },
};

#[derive(Debug, Deserialize)]
pub struct RoutePayload {
    username: Option<String>,
    password: Option<String>,
    remember: Option<String>,
}

#[derive(Debug, Validate)]
struct Credentials {
    #[validate(custom(function = "validate_username"))]
    username: String,
    #[validate(custom(function = "validate_password_present"))]
    password: String,
}

impl RoutePayload {
    fn into_credentials(self) -> Result<(Credentials, bool), FieldError> {
        let username = self
            .username
            .ok_or_else(|| FieldError::required("username", "Username"))?;
        let password = self
            .password
            .ok_or_else(|| FieldError::required("password", "Password"))?;

        let credentials = Credentials {
            username: username.trim().to_string(),
            password,
        };

        Ok((credentials, parse_flag(self.remember.as_deref())))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RouteOutput {
    success: bool,
    message: String,
}

#[axum::debug_handler]
pub async fn signin(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(CookieJar, Json<RouteOutput>), (CookieJar, ApiError<SigninError>)> {
    let session = match state.sessions.start(&jar).await {
        Ok(session) => session,
        Err(error) => return Err((jar, error.into())),
    };
    let jar = jar.add(state.sessions.cookie(&session));

    match attempt_signin(&state, session, &headers, &body).await {
        Ok((session, remember_token)) => {
            let mut jar = jar.add(state.sessions.cookie(&session));

            if let Some(token) = remember_token {
                jar = jar.add(state.remember_me.cookie(token));
            }

            Ok((
                jar,
                Json(RouteOutput {
                    success: true,
                    message: String::from("Login successful"),
                }),
            ))
        }
        Err(error) => Err((jar, error)),
    }
}

async fn attempt_signin(
    state: &AppState,
    session: Session,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(Session, Option<String>), ApiError<SigninError>> {
    // 1. Reject forged requests before reading the form

    csrf::verify(&session, headers, state.settings.csrf_enabled)?;

    // 2. Decode and validate payload input

    let payload: RoutePayload = decode_form(body)?;
    let (credentials, remember) = payload.into_credentials()?;

    credentials
        .validate()
        .map_err(|errors| first_field_error(&errors, &["username", "password"]))?;

    // 3. Retrieve user and verify password. Unknown users still pay for a
    // full verification so both failures look the same.

    let user = state
        .database
        .query()
        .user
        .find_by_username(credentials.username.clone())
        .await?;

    let Some(user) = user else {
        state.hashing.verify_dummy(credentials.password).await?;
        info!(username = %credentials.username, "login rejected");

        return Err(SigninError::InvalidCredentials.into());
    };

    let password_matches = state
        .hashing
        .verify(credentials.password, user.password_hash.clone())
        .await?;

    if !password_matches {
        info!(username = %credentials.username, "login rejected");

        return Err(SigninError::InvalidCredentials.into());
    }

    // 4. Bind the user to a fresh session id

    let session = state.sessions.authenticate(session, &user).await?;

    // 5. Remember-me

    let remember_token = if remember {
        Some(state.remember_me.issue(user.id.clone()).await?)
    } else {
        None
    };

    if let Err(error) = state
        .database
        .query()
        .user
        .update_last_login(user.id.clone(), Utc::now())
        .await
    {
        warn!(user_id = %user.id, %error, "failed to record last login");
    }

    info!(user_id = %user.id, username = %user.username, remember, "user logged in");

    Ok((session, remember_token))
}
