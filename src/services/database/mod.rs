pub mod session;
pub mod user;

use std::{future::IntoFuture, time::Duration};

use derive_more::Display;
use surrealdb::{
    engine::any::{self, Any},
    opt::auth::Root,
    Surreal,
};
use tracing::info;

use crate::{setup::DatabaseSettings, utils::schemas::SCHEMAS};

#[derive(Debug, Display)]
pub enum DatabaseError {
    #[display("database query failed: {_0}")]
    Query(surrealdb::Error),
    #[display("unique constraint violated: {_0}")]
    ConstraintViolation(String),
    #[display("database call timed out after {_0:?}")]
    Timeout(Duration),
    #[display("database misconfigured: {_0}")]
    Configuration(String),
}

impl std::error::Error for DatabaseError {}

impl From<surrealdb::Error> for DatabaseError {
    fn from(error: surrealdb::Error) -> Self {
        // Unique index violations come back as "Database index `...` already
        // contains ..." from both the embedded and the remote engines.
        let message = error.to_string();

        if message.contains("already contains") {
            DatabaseError::ConstraintViolation(message)
        } else {
            DatabaseError::Query(error)
        }
    }
}

/// Runs a database future under the configured deadline.
pub(crate) async fn with_timeout<T, F>(timeout: Duration, future: F) -> Result<T, DatabaseError>
where
    F: IntoFuture<Output = Result<T, surrealdb::Error>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result.map_err(DatabaseError::from),
        Err(_) => Err(DatabaseError::Timeout(timeout)),
    }
}

#[derive(Clone)]
pub struct DatabaseQuery<'a> {
    pub user: user::UserQuery<'a>,
    pub session: session::SessionQuery<'a>,
}

#[derive(Clone)]
pub struct DatabaseLayer {
    pub query_timeout: Duration,
    db: Surreal<Any>,
}

impl DatabaseLayer {
    /// Connects through the engine picked by the endpoint scheme and signs in
    /// when the engine is remote.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, DatabaseError> {
        let timeout = settings.query_timeout;

        let credentials = match (&settings.username, &settings.password) {
            _ if settings.is_embedded() => None,
            (Some(username), Some(password)) => Some(Root {
                username: username.as_str(),
                password: password.as_str(),
            }),
            _ => {
                return Err(DatabaseError::Configuration(String::from(
                    "remote database requires DB_USER and DB_PASS",
                )))
            }
        };

        let db = with_timeout(timeout, any::connect(settings.endpoint.clone())).await?;

        if let Some(root) = credentials {
            with_timeout(timeout, db.signin(root)).await?;
        }

        with_timeout(
            timeout,
            db.use_ns(settings.namespace.clone())
                .use_db(settings.database.clone()),
        )
        .await?;

        info!(
            endpoint = %settings.endpoint,
            namespace = %settings.namespace,
            database = %settings.database,
            "connected to database"
        );

        Ok(Self {
            query_timeout: timeout,
            db,
        })
    }

    pub async fn initialize_schemas(&self, schemas: &[&str]) -> Result<(), DatabaseError> {
        for schema_query in schemas {
            with_timeout(self.query_timeout, async {
                self.db.query(*schema_query).await?.check()
            })
            .await?;
        }

        Ok(())
    }

    pub async fn health_check(&self) -> bool {
        with_timeout(self.query_timeout, self.db.health()).await.is_ok()
    }

    pub fn query(&self) -> DatabaseQuery {
        DatabaseQuery {
            user: user::UserQuery::new(&self.db, self.query_timeout),
            session: session::SessionQuery::new(&self.db, self.query_timeout),
        }
    }
}

/// Connects and applies every table definition.
pub async fn setup(settings: &DatabaseSettings) -> Result<DatabaseLayer, DatabaseError> {
    let layer = DatabaseLayer::connect(settings).await?;
    layer.initialize_schemas(&SCHEMAS).await?;

    Ok(layer)
}

#[cfg(test)]
pub(crate) async fn test_database() -> DatabaseLayer {
    let settings = DatabaseSettings {
        endpoint: String::from("mem://"),
        namespace: String::from("fansite"),
        database: String::from("test"),
        username: None,
        password: None,
        query_timeout: Duration::from_secs(5),
    };

    let layer = DatabaseLayer::connect(&settings)
        .await
        .expect("in-memory database connects");

    layer
        .initialize_schemas(&SCHEMAS)
        .await
        .expect("schemas apply");

    layer
}
