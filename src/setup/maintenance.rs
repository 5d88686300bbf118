use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::setup::AppState;

/// Deletes expired sessions and reset tokens once. Returns how many of each went away.
/// Failures are logged and counted as zero; validity never depends on this running.
pub async fn purge_expired(state: &AppState) -> (usize, usize) {
    let sessions = match state.sessions().purge_expired().await {
        Ok(count) => count,
        Err(error) => {
            warn!(%error, "failed to purge expired sessions");
            0
        }
    };

    let reset_tokens = match state.password_reset().purge_expired().await {
        Ok(count) => count,
        Err(error) => {
            warn!(%error, "failed to purge expired reset tokens");
            0
        }
    };

    (sessions, reset_tokens)
}

pub fn spawn_purge_task(state: AppState) -> JoinHandle<()> {
    let period = state.config.purge_interval;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(?period, "expiry purge task started");

        loop {
            interval.tick().await;

            match purge_expired(&state).await {
                (0, 0) => debug!("nothing to purge"),
                (sessions, reset_tokens) => {
                    info!(sessions, reset_tokens, "purged expired credentials")
                }
            }
        }
    })
}
