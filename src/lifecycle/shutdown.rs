//! Shutdown coordination for background tasks.

use std::time::Duration;
use tokio::sync::broadcast;

/// Broadcast shutdown signal shared by long-running tasks such as the
/// idle reaper.
#[derive(Debug)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a coordinator with no subscribers.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Get a receiver that fires once on shutdown.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Signal every subscriber to stop.
    pub fn trigger(&self) {
        tracing::info!(tasks = self.tx.receiver_count(), "Shutdown triggered");
        let _ = self.tx.send(());
    }

    /// Number of tasks still subscribed.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Wait until every subscriber has dropped its receiver, or `deadline` passes.
    ///
    /// Returns false on deadline.
    pub async fn wait_for_tasks(&self, deadline: Duration) -> bool {
        let drained = async {
            while self.tx.receiver_count() > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        match tokio::time::timeout(deadline, drained).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    remaining = self.tx.receiver_count(),
                    "Background tasks still running at shutdown deadline"
                );
                false
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_subscribers() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        let task = tokio::spawn(async move {
            let _ = rx.recv().await;
        });

        shutdown.trigger();
        task.await.unwrap();
        assert!(shutdown.wait_for_tasks(Duration::from_secs(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_with_live_receiver() {
        let shutdown = Shutdown::new();
        let _rx = shutdown.subscribe();
        assert!(!shutdown.wait_for_tasks(Duration::from_millis(50)).await);
        assert_eq!(shutdown.receiver_count(), 1);
    }
}
