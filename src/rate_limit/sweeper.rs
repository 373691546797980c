//! Background worker that evicts idle client rate state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::governor::RateGovernor;

/// Periodically sweeps a `RateGovernor`.
pub struct RateLimitSweeper {
    governor: Arc<RateGovernor>,
    interval: Duration,
    shutdown: Arc<Notify>,
}

impl RateLimitSweeper {
    /// Create a sweeper running every `interval`.
    #[must_use]
    pub fn new(governor: Arc<RateGovernor>, interval: Duration) -> Self {
        Self {
            governor,
            interval,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Notifier that stops the worker.
    #[must_use]
    pub fn shutdown_notifier(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Spawn the worker as a tokio task.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        info!(interval = ?self.interval, "Starting rate limit sweeper");

        loop {
            tokio::select! {
                () = tokio::time::sleep(self.interval) => self.sweep_once(),
                () = self.shutdown.notified() => break,
            }
        }

        info!("Rate limit sweeper shutting down");
    }

    fn sweep_once(&self) {
        let evicted = self.governor.sweep(Instant::now());
        if evicted > 0 {
            info!(evicted, "Evicted idle rate limit state");
        } else {
            debug!("Rate limit sweep found nothing to evict");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;

    #[tokio::test]
    async fn test_sweeper_stops_on_notify() {
        let governor = Arc::new(RateGovernor::new(&RateLimitConfig::default()));
        let sweeper = RateLimitSweeper::new(governor, Duration::from_secs(3600));
        let shutdown = sweeper.shutdown_notifier();
        let handle = sweeper.spawn();

        shutdown.notify_one();
        let joined = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }
}
