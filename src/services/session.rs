use std::{collections::BTreeMap, time::Duration};

use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
    services::database::{session::SessionRecord, user::User, DatabaseError, DatabaseLayer},
    setup::SessionSettings,
    utils::{
        cookies::{removal_cookie, session_cookie, SESSION_COOKIE},
        crypto::{generate_token, hash_token},
    },
};

pub const USER_ID_KEY: &str = "user_id";
pub const USERNAME_KEY: &str = "username";
pub const CSRF_TOKEN_KEY: &str = "csrf_token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated { user_id: String },
}

/// A live session: the raw token from the cookie plus its stored record.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    record: SessionRecord,
}

impl Session {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.record.data.get(key).map(String::as_str)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.get(USER_ID_KEY)
    }

    pub fn username(&self) -> Option<&str> {
        self.get(USERNAME_KEY)
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.get(CSRF_TOKEN_KEY)
    }

    pub fn state(&self) -> SessionState {
        match self.user_id() {
            Some(user_id) => SessionState::Authenticated {
                user_id: user_id.to_string(),
            },
            None => SessionState::Anonymous,
        }
    }
}

/// Server-side sessions keyed by the SHA-256 of the cookie token.
#[derive(Clone)]
pub struct SessionManager {
    database: DatabaseLayer,
    ttl: Duration,
    cookie_secure: bool,
}

impl SessionManager {
    pub fn new(database: DatabaseLayer, settings: &SessionSettings) -> Self {
        Self {
            database,
            ttl: settings.ttl,
            cookie_secure: settings.cookie_secure,
        }
    }

    fn expires_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::hours(12));

        now + ttl
    }

    fn new_record(&self, token: &str, data: BTreeMap<String, String>) -> SessionRecord {
        let now = Utc::now();

        SessionRecord {
            id: hash_token(token),
            data,
            created_at: now,
            expires_at: self.expires_from(now),
        }
    }

    async fn create(&self, data: BTreeMap<String, String>) -> Result<Session, DatabaseError> {
        let token = generate_token();
        let record = self.new_record(&token, data);

        self.database.query().session.create(&record).await?;

        Ok(Session { token, record })
    }

    /// Live session for the request cookie, if any. Never creates one.
    pub async fn current(&self, jar: &CookieJar) -> Result<Option<Session>, DatabaseError> {
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(None);
        };

        let token = cookie.value().to_string();
        let record = self
            .database
            .query()
            .session
            .get(hash_token(&token))
            .await?;

        Ok(record.map(|record| Session { token, record }))
    }

    /// Returns the live session for the request or creates an anonymous one
    /// with a fresh CSRF token.
    pub async fn start(&self, jar: &CookieJar) -> Result<Session, DatabaseError> {
        if let Some(session) = self.current(jar).await? {
            return Ok(session);
        }

        let mut data = BTreeMap::new();
        data.insert(CSRF_TOKEN_KEY.to_string(), generate_token());

        let session = self.create(data).await?;
        debug!("started anonymous session");

        Ok(session)
    }

    /// Writes one key and persists the session, extending its idle expiry.
    pub async fn set(
        &self,
        session: &mut Session,
        key: &str,
        value: String,
    ) -> Result<(), DatabaseError> {
        session.record.data.insert(key.to_string(), value);
        session.record.expires_at = self.expires_from(Utc::now());

        self.database.query().session.save(&session.record).await
    }

    /// Binds the user under a new session id. The previous record is deleted
    /// so a token captured before login is useless afterwards.
    pub async fn authenticate(
        &self,
        session: Session,
        user: &User,
    ) -> Result<Session, DatabaseError> {
        let mut data = session.record.data;
        data.insert(USER_ID_KEY.to_string(), user.id.clone());
        data.insert(USERNAME_KEY.to_string(), user.username.clone());

        let rotated = self.create(data).await?;

        self.database
            .query()
            .session
            .delete(session.record.id)
            .await?;

        debug!(user_id = %user.id, "session rotated on login");

        Ok(rotated)
    }

    /// Deletes the stored session, if any, and always emits a removal cookie.
    pub async fn destroy(&self, jar: CookieJar) -> Result<CookieJar, DatabaseError> {
        if let Some(cookie) = jar.get(SESSION_COOKIE) {
            let id = hash_token(cookie.value());
            self.database.query().session.delete(id).await?;
        }

        Ok(jar.add(self.removal_cookie()))
    }

    pub fn cookie(&self, session: &Session) -> Cookie<'static> {
        session_cookie(session.token.clone(), self.cookie_secure)
    }

    pub fn removal_cookie(&self) -> Cookie<'static> {
        removal_cookie(SESSION_COOKIE, self.cookie_secure)
    }

    pub async fn purge_expired(&self) -> Result<usize, DatabaseError> {
        self.database
            .query()
            .session
            .delete_expired(Utc::now())
            .await
    }
}

#[cfg(test)]
pub(crate) fn test_sessions(database: DatabaseLayer) -> SessionManager {
    SessionManager::new(
        database,
        &SessionSettings {
            ttl: Duration::from_secs(3_600),
            purge_interval: Duration::from_secs(60),
            cookie_secure: false,
        },
    )
}
