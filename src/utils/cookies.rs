use axum_extra::extract::cookie::{Cookie, SameSite};
use cookie::time::{Duration, OffsetDateTime};

pub const SESSION_COOKIE: &str = "session_id";
pub const REMEMBER_COOKIE: &str = "remember_token";

pub const REMEMBER_TOKEN_DAYS: i64 = 30;

/// Browser-session cookie carrying the raw session token. The server-side
/// expiry is enforced on the stored record, not here.
pub fn session_cookie(session_token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_token))
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure)
        .http_only(true)
        .build()
}

/// Long-lived login cookie. Always `Secure`, whatever the session cookie
/// is configured with.
pub fn remember_cookie(token: String) -> Cookie<'static> {
    let lifetime = Duration::days(REMEMBER_TOKEN_DAYS);

    Cookie::build((REMEMBER_COOKIE, token))
        .path("/")
        .same_site(SameSite::Strict)
        .secure(true)
        .http_only(true)
        .max_age(lifetime)
        .expires(OffsetDateTime::now_utc() + lifetime)
        .build()
}

/// Empty value with an expiry in the past, carrying the attributes the
/// cookie was set with so browsers match and drop it.
pub fn removal_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    let (same_site, secure) = if name == REMEMBER_COOKIE {
        (SameSite::Strict, true)
    } else {
        (SameSite::Lax, secure)
    };

    let mut cookie = Cookie::build((name, ""))
        .path("/")
        .same_site(same_site)
        .secure(secure)
        .http_only(true)
        .build();

    cookie.make_removal();
    cookie
}
