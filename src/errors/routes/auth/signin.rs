use derive_more::Display;
use hyper::StatusCode;
use serde_json::{json, Value};

use crate::{
    errors::{response::ApiError, CommonError, ErrorResponse},
    services::database::DatabaseError,
    utils::{crypto::HashingError, validation::FieldError},
};

#[derive(Debug, Display)]
pub enum SigninError {
    Common(CommonError),
    #[display("invalid credentials")]
    InvalidCredentials,
}

impl ErrorResponse for SigninError {
    fn error_name(&self) -> &str {
        match self {
            SigninError::Common(e) => e.error_name(),
            SigninError::InvalidCredentials => "Invalid Credentials",
        }
    }

    fn error_message(&self) -> Value {
        match self {
            SigninError::Common(e) if e.status_code().is_server_error() => {
                json!("An error occurred during authentication")
            }
            SigninError::Common(e) => e.error_message(),
            SigninError::InvalidCredentials => json!("Invalid credentials"),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            SigninError::Common(e) => e.status_code(),
            SigninError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<CommonError> for SigninError {
    fn from(error: CommonError) -> Self {
        SigninError::Common(error)
    }
}

impl From<SigninError> for ApiError<SigninError> {
    fn from(error: SigninError) -> Self {
        ApiError(error)
    }
}

// Automatic Error Conversion

impl From<CommonError> for ApiError<SigninError> {
    fn from(error: CommonError) -> Self {
        ApiError(SigninError::Common(error))
    }
}

impl From<FieldError> for ApiError<SigninError> {
    fn from(error: FieldError) -> Self {
        ApiError(SigninError::Common(CommonError::Validation(error)))
    }
}

impl From<DatabaseError> for ApiError<SigninError> {
    fn from(error: DatabaseError) -> Self {
        ApiError(SigninError::Common(CommonError::Database(error)))
    }
}

impl From<HashingError> for ApiError<SigninError> {
    fn from(error: HashingError) -> Self {
        ApiError(SigninError::Common(CommonError::Hashing(error)))
    }
}
