//! Retry policy.
//!
//! # Design Decisions
//! - Only transport failures are retried; any HTTP response is final
//! - The ceiling counts failed attempts, so `max_retries = 3` allows up to
//!   four forwarding attempts per request
//! - Failover pauses are short: the next peer is a different backend, so the
//!   pause only spreads out concurrent failovers
//! - `base_delay_ms = 0` fails over immediately

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Doubling stops here; with any sane base the cap is reached long before.
const MAX_DOUBLINGS: u32 = 16;

/// Decides whether a request may fail over to another backend.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether another attempt is allowed after `failed_attempts` failures.
    pub fn allows(&self, failed_attempts: u32) -> bool {
        failed_attempts <= self.max_retries
    }

    /// Pause before the attempt that follows `failed_attempts` failures:
    /// `base * 2^(failed - 1)` capped at `max_delay_ms`, plus up to 10% jitter.
    pub fn delay(&self, failed_attempts: u32) -> Duration {
        if self.base_delay_ms == 0 || failed_attempts == 0 {
            return Duration::ZERO;
        }

        let doublings = (failed_attempts - 1).min(MAX_DOUBLINGS);
        let step = self.base_delay_ms.saturating_mul(1u64 << doublings).min(self.max_delay_ms.max(self.base_delay_ms));
        let jitter = rand::thread_rng().gen_range(0..=step / 10);
        Duration::from_millis(step + jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
