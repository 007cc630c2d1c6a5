//! Request dispatch with failover.
//!
//! # Responsibilities
//! - Ask the pool for the next alive backend
//! - Forward the buffered request to it
//! - On transport failure: mark the backend down, then fail over to the
//!   next peer until the retry ceiling is reached
//!
//! # Design Decisions
//! - A single transport failure marks the backend down immediately; the
//!   next health sweep brings it back if it is reachable
//! - Any HTTP response, including 5xx, is returned to the client as-is
//! - Attempts share one request budget; each attempt is cut to what is left
//!   of it, so hanging backends still end in a 503 and get marked down

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Response;
use tokio::time::{self, Instant};

use crate::error::{DispatchError, ForwardError};
use crate::http::request::UpstreamRequest;
use crate::load_balancer::pool::ServerPool;
use crate::observability::metrics;
use crate::resilience::RetryPolicy;

/// Per-request entry point into the pool.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    pool: Arc<ServerPool>,
    retry: RetryPolicy,
    budget: Option<Duration>,
}

impl Dispatcher {
    pub fn new(pool: Arc<ServerPool>, retry: RetryPolicy) -> Self {
        Self {
            pool,
            retry,
            budget: None,
        }
    }

    /// Bound the total time spent on one request, across all attempts.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }

    /// Forward `request` to a live backend, failing over on transport errors.
    pub async fn dispatch(&self, request: &UpstreamRequest, request_id: &str) -> Result<Response<Body>, DispatchError> {
        let mut attempts: u32 = 0;
        let deadline = self.budget.map(|budget| Instant::now() + budget);

        loop {
            let remaining = deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()));
            if remaining.is_some_and(|left| left.is_zero()) {
                tracing::warn!(request_id = %request_id, attempts, "Request budget spent");
                return Err(DispatchError::RetriesExhausted { attempts });
            }

            let Some(peer) = self.pool.get_next_peer() else {
                tracing::warn!(request_id = %request_id, attempts, "No alive backend available");
                return Err(DispatchError::NoAlivePeer { attempts });
            };

            let outcome = match remaining {
                Some(left) => time::timeout(left, peer.forward(request.build()))
                    .await
                    .unwrap_or(Err(ForwardError::Timeout(left))),
                None => peer.forward(request.build()).await,
            };

            match outcome {
                Ok(response) => {
                    tracing::debug!(
                        request_id = %request_id,
                        backend = %peer,
                        status = %response.status(),
                        "Backend responded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    attempts += 1;
                    tracing::warn!(
                        request_id = %request_id,
                        backend = %peer,
                        attempt = attempts,
                        error = %e,
                        "Forwarding failed, marking backend down"
                    );
                    self.pool.mark_status(peer.address(), false);
                    metrics::record_failover(&peer);

                    if !self.retry.allows(attempts) {
                        tracing::warn!(
                            request_id = %request_id,
                            attempts,
                            max_retries = self.retry.max_retries(),
                            "Retry ceiling reached"
                        );
                        return Err(DispatchError::RetriesExhausted { attempts });
                    }

                    let delay = self.retry.delay(attempts);
                    if !delay.is_zero() {
                        time::sleep(delay).await;
                    }
                }
            }
        }
    }
}
