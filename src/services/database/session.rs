use std::{collections::BTreeMap, time::Duration};

use chrono::{serde::ts_seconds, DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::{engine::any::Any, Surreal};

use super::{with_timeout, DatabaseError};

/// Stored session. `id` is the SHA-256 of the token held in the cookie, the
/// raw token never reaches the database.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: String,

    #[serde(default)]
    pub data: BTreeMap<String, String>,

    #[serde(with = "ts_seconds")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

// Only the count of removed rows matters.
#[derive(Deserialize)]
struct RemovedSession {
    #[allow(dead_code)]
    #[serde(with = "ts_seconds")]
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionQuery<'a> {
    db: &'a Surreal<Any>,
    timeout: Duration,
}

impl<'a> SessionQuery<'a> {
    pub(crate) fn new(db: &'a Surreal<Any>, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

impl<'a> SessionQuery<'a> {
    pub async fn create(&self, record: &SessionRecord) -> Result<(), DatabaseError> {
        let query = r#"
            CREATE type::thing("session", $id) SET
                data = $data,
                created_at = $created_at,
                expires_at = $expires_at
            RETURN NONE
        "#;

        with_timeout(
            self.timeout,
            self.db
                .query(query)
                .bind(("id", record.id.clone()))
                .bind(("data", record.data.clone()))
                .bind(("created_at", record.created_at.timestamp()))
                .bind(("expires_at", record.expires_at.timestamp())),
        )
        .await?
        .check()?;

        Ok(())
    }

    /// Live session by id. Records past their expiry read as absent even
    /// before the reaper removes them.
    pub async fn get(&self, id: String) -> Result<Option<SessionRecord>, DatabaseError> {
        let query = r#"
            SELECT meta::id(id) AS id, data, created_at, expires_at
            FROM type::thing("session", $id)
            WHERE expires_at > $now
        "#;

        let now = Utc::now().timestamp();

        with_timeout(self.timeout, async {
            let mut response = self
                .db
                .query(query)
                .bind(("id", id))
                .bind(("now", now))
                .await?
                .check()?;

            let records: Vec<SessionRecord> = response.take(0)?;

            Ok::<_, surrealdb::Error>(records.into_iter().next())
        })
        .await
    }

    pub async fn save(&self, record: &SessionRecord) -> Result<(), DatabaseError> {
        let query = r#"
            UPDATE session SET
                data = $data,
                expires_at = $expires_at
            WHERE id = type::thing("session", $id)
            RETURN NONE
        "#;

        with_timeout(
            self.timeout,
            self.db
                .query(query)
                .bind(("id", record.id.clone()))
                .bind(("data", record.data.clone()))
                .bind(("expires_at", record.expires_at.timestamp())),
        )
        .await?
        .check()?;

        Ok(())
    }

    pub async fn delete(&self, id: String) -> Result<(), DatabaseError> {
        let query = r#"DELETE type::thing("session", $id)"#;

        with_timeout(self.timeout, self.db.query(query).bind(("id", id)))
            .await?
            .check()?;

        Ok(())
    }

    /// Removes every record whose expiry is at or before `now`, returning
    /// how many were removed.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, DatabaseError> {
        let query = r#"DELETE session WHERE expires_at <= $now RETURN BEFORE"#;

        let now = now.timestamp();

        with_timeout(self.timeout, async {
            let mut response = self
                .db
                .query(query)
                .bind(("now", now))
                .await?
                .check()?;

            let removed: Vec<RemovedSession> = response.take(0)?;

            Ok::<_, surrealdb::Error>(removed.len())
        })
        .await
    }
}
