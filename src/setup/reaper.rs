use std::time::Duration;

use tokio::{task::JoinHandle, time};
use tracing::{info, warn};

use crate::services::session::SessionManager;

/// Periodically removes expired sessions. Failures are logged and retried on
/// the next tick.
pub fn spawn_session_reaper(sessions: SessionManager, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "purged expired sessions"),
                Err(error) => warn!(%error, "session purge failed"),
            }
        }
    })
}
