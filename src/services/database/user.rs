use std::time::Duration;

use chrono::{serde::ts_seconds, serde::ts_seconds_option, DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use surrealdb::{engine::any::Any, Surreal};

use super::{with_timeout, DatabaseError};
use crate::utils::crypto::generate_uuid;

const USER_FIELDS: &str = r#"
    meta::id(id) AS id,
    username,
    email,
    password_hash,
    remember_token_hash,
    last_login_at,
    created_at
"#;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,

    #[serde(default)]
    pub remember_token_hash: Option<String>,

    #[serde(default, with = "ts_seconds_option")]
    pub last_login_at: Option<DateTime<Utc>>,

    #[serde(with = "ts_seconds")]
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RecordKey {
    #[allow(dead_code)]
    id: String,
}

#[derive(Clone)]
pub struct UserQuery<'a> {
    db: &'a Surreal<Any>,
    timeout: Duration,
}

impl<'a> UserQuery<'a> {
    pub(crate) fn new(db: &'a Surreal<Any>, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    async fn select_one(
        &self,
        filter: &str,
        key: &'static str,
        value: String,
    ) -> Result<Option<User>, DatabaseError> {
        let query = format!("SELECT {USER_FIELDS} FROM user WHERE {filter} LIMIT 1");

        with_timeout(self.timeout, async {
            let mut response = self.db.query(query).bind((key, value)).await?.check()?;
            let users: Vec<User> = response.take(0)?;

            Ok::<_, surrealdb::Error>(users.into_iter().next())
        })
        .await
    }

    async fn execute(
        &self,
        query: &'static str,
        bindings: Vec<(&'static str, Value)>,
    ) -> Result<(), DatabaseError> {
        with_timeout(self.timeout, async {
            let mut request = self.db.query(query);

            for (key, value) in bindings {
                request = request.bind((key, value));
            }

            request.await?.check()?;
            Ok::<_, surrealdb::Error>(())
        })
        .await
    }
}

impl<'a> UserQuery<'a> {
    pub async fn find_by_username(&self, username: String) -> Result<Option<User>, DatabaseError> {
        self.select_one(
            "username_key = $username_key",
            "username_key",
            username.to_lowercase(),
        )
        .await
    }

    pub async fn find_by_remember_token_hash(
        &self,
        token_hash: String,
    ) -> Result<Option<User>, DatabaseError> {
        self.select_one(
            "remember_token_hash = $token_hash",
            "token_hash",
            token_hash,
        )
        .await
    }

    pub async fn exists_by_username_or_email(
        &self,
        username: String,
        email: String,
    ) -> Result<bool, DatabaseError> {
        let query = r#"
            SELECT meta::id(id) AS id FROM user
            WHERE username_key = $username_key OR email = $email
            LIMIT 1
        "#;

        with_timeout(self.timeout, async {
            let mut response = self
                .db
                .query(query)
                .bind(("username_key", username.to_lowercase()))
                .bind(("email", email.to_lowercase()))
                .await?
                .check()?;

            let matches: Vec<RecordKey> = response.take(0)?;

            Ok::<_, surrealdb::Error>(!matches.is_empty())
        })
        .await
    }

    /// Creates the user record. Usernames and emails are unique regardless of
    /// letter case; the email is stored lowercased. A duplicate that slipped
    /// past the existence check surfaces as `ConstraintViolation`.
    pub async fn insert(
        &self,
        username: String,
        email: String,
        password_hash: String,
    ) -> Result<User, DatabaseError> {
        let user = User {
            id: generate_uuid(),
            username,
            email: email.to_lowercase(),
            password_hash,
            remember_token_hash: None,
            last_login_at: None,
            created_at: Utc::now(),
        };

        let query = r#"
            CREATE type::thing("user", $id) SET
                username = $username,
                username_key = $username_key,
                email = $email,
                password_hash = $password_hash,
                created_at = $created_at
            RETURN NONE
        "#;

        self.execute(
            query,
            vec![
                ("id", user.id.clone().into()),
                ("username", user.username.clone().into()),
                ("username_key", user.username.to_lowercase().into()),
                ("email", user.email.clone().into()),
                ("password_hash", user.password_hash.clone().into()),
                ("created_at", user.created_at.timestamp().into()),
            ],
        )
        .await?;

        Ok(user)
    }

    pub async fn update_last_login(
        &self,
        user_id: String,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let query = r#"
            UPDATE user SET last_login_at = $now
            WHERE id = type::thing("user", $id)
            RETURN NONE
        "#;

        self.execute(
            query,
            vec![("id", user_id.into()), ("now", now.timestamp().into())],
        )
        .await
    }

    pub async fn set_remember_token_hash(
        &self,
        user_id: String,
        token_hash: String,
    ) -> Result<(), DatabaseError> {
        let query = r#"
            UPDATE user SET remember_token_hash = $token_hash
            WHERE id = type::thing("user", $id)
            RETURN NONE
        "#;

        self.execute(
            query,
            vec![("id", user_id.into()), ("token_hash", token_hash.into())],
        )
        .await
    }

    pub async fn clear_remember_token_hash(&self, user_id: String) -> Result<(), DatabaseError> {
        let query = r#"
            UPDATE user SET remember_token_hash = NONE
            WHERE id = type::thing("user", $id)
            RETURN NONE
        "#;

        self.execute(query, vec![("id", user_id.into())]).await
    }
}
