//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request arrives at the dispatcher
//!     → pool.rs (get_next_peer)
//!         → round_robin.rs (advance the shared rotation counter)
//!         → scan forward from that index for an alive backend
//!     → backend.rs (forward through the backend's Forwarder)
//!     → on transport failure: pool.mark_status(address, false)
//! ```
//!
//! # Design Decisions
//! - One rotation counter per pool, shared by all requests
//! - Dead backends are skipped, never removed
//! - Liveness is a per-backend atomic flag; no pool-wide lock

pub mod backend;
pub mod pool;
pub mod round_robin;

pub use backend::{Backend, Forwarder};
pub use pool::ServerPool;
