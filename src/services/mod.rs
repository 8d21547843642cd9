pub mod csrf;
pub mod database;
pub mod remember_me;
pub mod session;
