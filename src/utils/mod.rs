pub mod cookies;
pub mod crypto;
pub mod schemas;
pub mod validation;
