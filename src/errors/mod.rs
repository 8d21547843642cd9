pub mod common;
pub mod response;
pub mod routes;

pub use common::CommonError;
pub use response::{ApiError, ErrorResponse};
pub use routes::*;
