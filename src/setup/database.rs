use crate::{
    services::database::{self, DatabaseError, DatabaseLayer},
    setup::DatabaseSettings,
};

pub async fn setup_database(settings: &DatabaseSettings) -> Result<DatabaseLayer, DatabaseError> {
    database::setup(settings).await
}
