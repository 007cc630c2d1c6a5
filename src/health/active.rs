//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe backends
//! - Resync every backend's liveness with the probe result

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::health::probe::{self, Probe};
use crate::load_balancer::pool::ServerPool;

/// Background task that sweeps the pool on a fixed interval.
pub struct HealthChecker {
    pool: Arc<ServerPool>,
    probe: Box<dyn Probe>,
    interval: Duration,
    jitter: Duration,
}

impl HealthChecker {
    pub fn new(pool: Arc<ServerPool>, probe: Box<dyn Probe>, interval: Duration) -> Self {
        Self {
            pool,
            probe,
            interval,
            jitter: Duration::ZERO,
        }
    }

    /// Build a checker using the probe and timings from configuration.
    pub fn from_config(pool: Arc<ServerPool>, config: &HealthCheckConfig) -> Self {
        Self::new(pool, probe::from_config(config), Duration::from_secs(config.interval_secs))
            .with_jitter(Duration::from_millis(config.jitter_ms))
    }

    /// Delay each sweep by a random amount up to `jitter`.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            probe = ?self.probe,
            "Health checker starting"
        );

        // First sweep one interval after start; backends begin alive.
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health checker received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run one full probe pass over the pool.
    pub async fn sweep(&self) {
        if !self.jitter.is_zero() {
            let jitter_ms = fastrand::u64(0..=self.jitter.as_millis() as u64);
            time::sleep(Duration::from_millis(jitter_ms)).await;
        }

        tracing::info!("Starting health check");
        self.pool.health_check(self.probe.as_ref()).await;
        tracing::info!(
            alive = self.pool.alive_count(),
            total = self.pool.len(),
            "Health check completed"
        );
    }
}
