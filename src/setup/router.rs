use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    routes,
    services::{database::DatabaseLayer, remember_me::RememberMe, session::SessionManager},
    setup::{AppConfig, AuthSettings},
    utils::crypto::{HashingError, PasswordHashing},
};

#[derive(Clone)]
pub struct AppState {
    pub database: DatabaseLayer,
    pub hashing: PasswordHashing,
    pub sessions: SessionManager,
    pub remember_me: RememberMe,
    pub settings: Arc<AuthSettings>,
}

impl AppState {
    /// Fails only when the argon2 cost parameters are rejected.
    pub fn new(config: &AppConfig, database: DatabaseLayer) -> Result<Self, HashingError> {
        Ok(Self {
            hashing: PasswordHashing::new(&config.hashing)?,
            sessions: SessionManager::new(database.clone(), &config.session),
            remember_me: RememberMe::new(database.clone()),
            settings: Arc::new(config.auth.clone()),
            database,
        })
    }
}

pub fn app(state: AppState) -> Router {
    routes::main_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn setup_api_router(
    state: AppState,
    addr: &str,
) -> std::io::Result<(Router, TcpListener)> {
    let listener = TcpListener::bind(addr).await?;

    Ok((app(state), listener))
}
