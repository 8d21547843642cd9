use derive_more::Display;

use crate::{
    services::database::DatabaseError,
    utils::{crypto::HashingError, validation::FieldError},
};

#[derive(Debug, Display)]
pub enum CommonError {
    Validation(FieldError),
    #[display("csrf token missing or invalid")]
    Forbidden,
    #[display("method not allowed")]
    MethodNotAllowed,
    Database(DatabaseError),
    Hashing(HashingError),
}

impl std::error::Error for CommonError {}

impl From<FieldError> for CommonError {
    fn from(error: FieldError) -> Self {
        CommonError::Validation(error)
    }
}

impl From<DatabaseError> for CommonError {
    fn from(error: DatabaseError) -> Self {
        CommonError::Database(error)
    }
}

impl From<HashingError> for CommonError {
    fn from(error: HashingError) -> Self {
        CommonError::Hashing(error)
    }
}
