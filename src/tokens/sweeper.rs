//! Periodic removal of expired tokens.
//!
//! Validation already treats expired tokens as absent; the sweeper only
//! bounds memory held by principals that never come back.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::tokens::TokenManager;

pub struct ExpirySweeper {
    manager: Arc<dyn TokenManager>,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(manager: Arc<dyn TokenManager>, interval: Duration) -> Self {
        Self { manager, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            manager = %self.manager.name(),
            "Token sweeper starting"
        );

        let mut ticker = time::interval(self.interval);
        // First tick fires immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.manager.sweep_expired();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Token sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
