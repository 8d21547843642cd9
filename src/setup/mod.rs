mod config;
mod database;
mod logging;
mod reaper;
mod router;

pub use config::{AppConfig, AuthSettings, DatabaseSettings, HashingSettings, SessionSettings};
pub use database::setup_database;
pub use logging::setup_logging;
pub use reaper::spawn_session_reaper;
pub use router::{app, setup_api_router, AppState};
