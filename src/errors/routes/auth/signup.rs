use derive_more::Display;
use hyper::StatusCode;
use serde_json::{json, Value};

use crate::{
    errors::{response::ApiError, CommonError, ErrorResponse},
    services::database::DatabaseError,
    utils::{crypto::HashingError, validation::FieldError},
};

#[derive(Debug, Display)]
pub enum SignupError {
    Common(CommonError),
    #[display("username or email already taken")]
    UserAlreadyExists,
}

impl ErrorResponse for SignupError {
    fn error_name(&self) -> &str {
        match self {
            SignupError::Common(e) => e.error_name(),
            SignupError::UserAlreadyExists => "User Already Exists",
        }
    }

    fn error_message(&self) -> Value {
        match self {
            SignupError::Common(e) if e.status_code().is_server_error() => {
                json!("An error occurred during registration")
            }
            SignupError::Common(e) => e.error_message(),
            SignupError::UserAlreadyExists => json!("Username or email already exists"),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            SignupError::Common(e) => e.status_code(),
            SignupError::UserAlreadyExists => StatusCode::CONFLICT,
        }
    }
}

impl From<CommonError> for SignupError {
    fn from(error: CommonError) -> Self {
        SignupError::Common(error)
    }
}

impl From<SignupError> for ApiError<SignupError> {
    fn from(error: SignupError) -> Self {
        ApiError(error)
    }
}

// Automatic Error Conversion

impl From<CommonError> for ApiError<SignupError> {
    fn from(error: CommonError) -> Self {
        ApiError(SignupError::Common(error))
    }
}

impl From<FieldError> for ApiError<SignupError> {
    fn from(error: FieldError) -> Self {
        ApiError(SignupError::Common(CommonError::Validation(error)))
    }
}

/// A unique index rejecting the insert means another signup won the race.
impl From<DatabaseError> for ApiError<SignupError> {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::ConstraintViolation(_) => ApiError(SignupError::UserAlreadyExists),
            error => ApiError(SignupError::Common(CommonError::Database(error))),
        }
    }
}

impl From<HashingError> for ApiError<SignupError> {
    fn from(error: HashingError) -> Self {
        ApiError(SignupError::Common(CommonError::Hashing(error)))
    }
}
