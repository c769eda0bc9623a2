//! Periodic session validation

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::manager::SessionManager;

pub const DEFAULT_VALIDATION_INTERVAL: Duration = Duration::from_secs(5 * 60);

const MIN_VALIDATION_INTERVAL: Duration = Duration::from_millis(10);

/// Re-check the session with the backend every `interval` while signed in.
/// The first check happens one interval after spawning. Intervals shorter
/// than 10ms are raised to 10ms.
pub fn spawn_periodic_validation(manager: SessionManager, interval: Duration) -> JoinHandle<()> {
    let interval = interval.max(MIN_VALIDATION_INTERVAL);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;

            if !manager.is_authenticated() {
                continue;
            }

            let valid = manager.validate_session().await;
            tracing::debug!(tab_id = %manager.tab_id(), valid, "Periodic session validation");
        }
    })
}
