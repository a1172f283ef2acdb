//! Background eviction of idle client entries.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::EvictionConfig;
use crate::guard::engine::AdmissionGuard;

pub struct IdleEvictor {
    guard: Arc<AdmissionGuard>,
    config: EvictionConfig,
}

impl IdleEvictor {
    pub fn new(guard: Arc<AdmissionGuard>, config: EvictionConfig) -> Self {
        Self { guard, config }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Idle client eviction disabled");
            return;
        }

        tracing::info!(
            interval_secs = self.config.interval_secs,
            idle_secs = self.config.idle_secs,
            max_tracked_clients = ?self.config.max_tracked_clients,
            "Idle evictor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));
        // The first tick completes immediately; nothing is idle yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Idle evictor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    fn sweep(&self) -> usize {
        self.guard.evict_idle(
            Instant::now(),
            Duration::from_secs(self.config.idle_secs),
            self.config.max_tracked_clients,
        )
    }
}
