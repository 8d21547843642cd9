mod errors;
mod routes;
mod services;
mod setup;
mod utils;

use dotenv::dotenv;
use setup::{
    setup_api_router, setup_database, setup_logging, spawn_session_reaper, AppConfig, AppState,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    setup_logging();

    let config = AppConfig::from_env()?;

    let database_layer = setup_database(&config.database).await?;
    let state = AppState::new(&config, database_layer)?;

    spawn_session_reaper(state.sessions.clone(), config.session.purge_interval);

    let (app, listener) = setup_api_router(state, &config.server_addr).await?;

    info!(addr = %config.server_addr, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
