use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::{
    errors::{ApiError, SignupError},
    routes::decode_form,
    services::{csrf, session::Session},
    setup::AppState,
    utils::validation::{
        first_field_error, validate_email_address, validate_password_strength, validate_username,
        FieldError,
    },
};

// `confirmPassword` is checked client-side; unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub struct RoutePayload {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Validate)]
struct Registration {
    #[validate(custom(function = "validate_username"))]
    username: String,
    #[validate(custom(function = "validate_email_address"))]
    email: String,
    #[validate(custom(function = "validate_password_strength"))]
    password: String,
}

impl TryFrom<RoutePayload> for Registration {
    type Error = FieldError;

    fn try_from(payload: RoutePayload) -> Result<Self, Self::Error> {
        let username = payload
            .username
            .ok_or_else(|| FieldError::required("username", "Username"))?;
        let email = payload
            .email
            .ok_or_else(|| FieldError::required("email", "Email"))?;
        let password = payload
            .password
            .ok_or_else(|| FieldError::required("password", "Password"))?;

        Ok(Registration {
            username: username.trim().to_string(),
            email: email.trim().to_lowercase(),
            password,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RouteOutput {
    success: bool,
    message: String,
}

#[axum::debug_handler]
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(CookieJar, Json<RouteOutput>), (CookieJar, ApiError<SignupError>)> {
    let session = match state.sessions.start(&jar).await {
        Ok(session) => session,
        Err(error) => return Err((jar, error.into())),
    };
    let jar = jar.add(state.sessions.cookie(&session));

    match attempt_signup(&state, &session, &headers, &body).await {
        Ok(()) => Ok((
            jar,
            Json(RouteOutput {
                success: true,
                message: String::from("Registration successful"),
            }),
        )),
        Err(error) => Err((jar, error)),
    }
}

async fn attempt_signup(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), ApiError<SignupError>> {
    // 1. Reject forged requests before reading the form

    csrf::verify(session, headers, state.settings.csrf_enabled)?;

    // 2. Decode and validate payload input

    let payload: RoutePayload = decode_form(body)?;
    let registration = Registration::try_from(payload)?;

    registration
        .validate()
        .map_err(|errors| first_field_error(&errors, &["username", "email", "password"]))?;

    // 3. Check user existence

    let taken = state
        .database
        .query()
        .user
        .exists_by_username_or_email(registration.username.clone(), registration.email.clone())
        .await?;

    if taken {
        return Err(SignupError::UserAlreadyExists.into());
    }

    // 4. Hash password and create the user. The unique indexes settle a
    // concurrent signup for the same name or email.

    let password_hash = state.hashing.hash(registration.password).await?;

    let user = state
        .database
        .query()
        .user
        .insert(registration.username, registration.email, password_hash)
        .await?;

    info!(user_id = %user.id, username = %user.username, "user registered");

    Ok(())
}
