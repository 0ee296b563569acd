//! Periodic dungeon garbage collection.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::repository::DungeonRepository;

/// Spawn the maintenance ticker: every interval, ask the repository to drop
/// dungeons with no joined players that have been idle past the window.
pub fn spawn_maintenance(
    dungeons: Arc<dyn DungeonRepository>,
    config: &ServerConfig,
) -> JoinHandle<()> {
    let period = config.maintenance_interval;
    let window = config.inactivity_window;

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.tick().await; // the first tick fires immediately

        loop {
            ticker.tick().await;
            match dungeons.cleanup_inactive(window) {
                Ok(0) => debug!("maintenance pass found nothing to collect"),
                Ok(removed) => info!(removed, "collected inactive dungeons"),
                Err(error) => warn!(%error, "dungeon cleanup failed"),
            }
        }
    })
}
