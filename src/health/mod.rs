//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer (+ optional jitter)
//!     → probe.rs: probe each backend (TCP connect or HTTP GET, bounded)
//!     → ServerPool::mark_status(address, reachable)
//!
//! Failure path (http/dispatcher.rs):
//!     Forwarding transport failure
//!     → ServerPool::mark_status(address, false) immediately
//! ```
//!
//! # Design Decisions
//! - Every sweep is a full resync, not a delta: a backend marked down by
//!   the dispatcher comes back as soon as a probe reaches it
//! - No retries within a sweep; the next tick absorbs flakiness
//! - Liveness is per-backend, not per-pool

pub mod active;
pub mod probe;

pub use active::HealthChecker;
pub use probe::{HttpProbe, Probe, TcpProbe};
