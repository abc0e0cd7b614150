//! Idle module cleanup.
//!
//! # Responsibilities
//! - Periodically unload modules unused for longer than the threshold
//! - Stop when the shutdown signal fires

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::config::ModuleConfig;
use crate::navigation::Router;

/// Background task that unloads idle modules.
pub struct IdleReaper {
    router: Arc<Router>,
    config: ModuleConfig,
}

impl IdleReaper {
    /// Create a reaper for `router` using the idle settings in `config`.
    pub fn new(router: Arc<Router>, config: ModuleConfig) -> Self {
        Self { router, config }
    }

    /// Sweep on every interval tick until `shutdown` fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.idle_cleanup_enabled {
            tracing::info!("Idle module cleanup disabled");
            return;
        }

        tracing::info!(
            interval_secs = self.config.cleanup_interval_secs,
            threshold_secs = self.config.idle_threshold_secs,
            "Idle reaper starting"
        );

        let mut ticker = time::interval(self.config.cleanup_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Idle reaper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// One cleanup pass. Returns the modules unloaded.
    pub async fn sweep(&self) -> Vec<String> {
        let unloaded = self
            .router
            .unload_idle_modules(self.config.idle_threshold())
            .await;
        if !unloaded.is_empty() {
            tracing::info!(modules = ?unloaded, "Idle modules unloaded");
        }
        unloaded
    }
}
