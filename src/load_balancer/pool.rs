//! Backend pool management.
//!
//! # Responsibilities
//! - Own the ordered set of backends and the shared rotation counter
//! - Select the next alive backend for a request
//! - Apply liveness updates from the dispatcher and the health checker

use std::sync::Arc;

use url::Url;

use crate::error::AddressError;
use crate::health::probe::Probe;
use crate::load_balancer::{
    backend::{parse_address, Backend, Forwarder},
    round_robin::RoundRobin,
};
use crate::observability::metrics;

/// Ordered collection of backends with round-robin selection.
///
/// Backends are appended while the pool is being built (`&mut self`); once
/// the pool is shared behind an `Arc` the list is read-only, so selection
/// and status updates never take a lock.
#[derive(Debug, Default)]
pub struct ServerPool {
    backends: Vec<Arc<Backend>>,
    rotation: RoundRobin,
}

impl ServerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool from configured addresses, binding each backend to the
    /// forwarder produced by `make_forwarder`.
    pub fn from_addresses<F>(addresses: &[String], mut make_forwarder: F) -> Result<Self, AddressError>
    where
        F: FnMut(&Url) -> Box<dyn Forwarder>,
    {
        let mut pool = Self::new();
        for raw in addresses {
            let address = parse_address(raw)?;
            let forwarder = make_forwarder(&address);
            tracing::info!(backend = %address, "Configured backend");
            let backend = Arc::new(Backend::new(address, forwarder));
            metrics::record_backend_alive(&backend, backend.is_alive());
            pool.add_backend(backend);
        }
        Ok(pool)
    }

    /// Append a backend to the rotation.
    pub fn add_backend(&mut self, backend: Arc<Backend>) {
        self.backends.push(backend);
    }

    /// Advance the rotation and return the next candidate index.
    /// `None` when the pool is empty.
    pub fn next_index(&self) -> Option<usize> {
        self.rotation.next_index(self.backends.len())
    }

    /// Set the liveness of the backend at `address`.
    ///
    /// Returns `false` when no backend has that address.
    pub fn mark_status(&self, address: &Url, alive: bool) -> bool {
        let Some(backend) = self.backends.iter().find(|b| b.address() == address) else {
            tracing::debug!(backend = %address, "Status update for unknown backend");
            return false;
        };

        let was_alive = backend.set_alive(alive);
        if was_alive != alive {
            if alive {
                tracing::info!(backend = %address, "Backend marked up");
            } else {
                tracing::info!(backend = %address, "Backend marked down");
            }
        }
        metrics::record_backend_alive(backend, alive);
        true
    }

    /// Return the first alive backend at or after the next rotation index,
    /// wrapping around and inspecting each backend at most once.
    pub fn get_next_peer(&self) -> Option<Arc<Backend>> {
        let len = self.backends.len();
        let start = self.next_index()?;

        for i in 0..len {
            let index = (start + i) % len;
            let backend = &self.backends[index];
            if backend.is_alive() {
                if i != 0 {
                    tracing::trace!(skipped = i, backend = %backend, "Skipped dead backends");
                }
                return Some(backend.clone());
            }
        }
        None
    }

    /// Probe every backend once and resync its liveness with the result.
    pub async fn health_check(&self, probe: &dyn Probe) {
        for backend in &self.backends {
            let alive = match probe.probe(backend.address()).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(backend = %backend, error = %e, "Health probe failed");
                    false
                }
            };
            tracing::debug!(backend = %backend, alive, "Health probe finished");
            self.mark_status(backend.address(), alive);
        }
    }

    /// All backends, in rotation order.
    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Number of backends currently marked alive.
    pub fn alive_count(&self) -> usize {
        self.backends.iter().filter(|b| b.is_alive()).count()
    }
}
