use axum_extra::extract::cookie::Cookie;

use crate::{
    services::database::{DatabaseError, DatabaseLayer},
    utils::{
        cookies::{remember_cookie, removal_cookie, REMEMBER_COOKIE},
        crypto::{generate_token, hash_token},
    },
};

/// Issues and revokes long-lived remember-me tokens. The raw token only ever
/// lives in the cookie; the user record holds its SHA-256.
#[derive(Clone)]
pub struct RememberMe {
    database: DatabaseLayer,
}

impl RememberMe {
    pub fn new(database: DatabaseLayer) -> Self {
        Self { database }
    }

    /// Overwrites any previously issued token for the user.
    pub async fn issue(&self, user_id: String) -> Result<String, DatabaseError> {
        let token = generate_token();

        self.database
            .query()
            .user
            .set_remember_token_hash(user_id, hash_token(&token))
            .await?;

        Ok(token)
    }

    pub async fn revoke(&self, user_id: String) -> Result<(), DatabaseError> {
        self.database
            .query()
            .user
            .clear_remember_token_hash(user_id)
            .await
    }

    pub fn cookie(&self, token: String) -> Cookie<'static> {
        remember_cookie(token)
    }

    pub fn removal_cookie(&self) -> Cookie<'static> {
        removal_cookie(REMEMBER_COOKIE, true)
    }
}
