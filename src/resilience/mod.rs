//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarding attempt fails (transport error or timeout):
//!     → retries.rs (has the retry ceiling been reached? how long to pause?)
//!     → dispatcher picks the next alive backend
//! ```
//!
//! # Design Decisions
//! - Failover goes to the next peer, never back to the one that just failed
//!   (it has been marked down)
//! - The retry ceiling bounds worst-case latency when every backend fails
//! - Jittered backoff keeps concurrent failovers from stampeding

pub mod retries;

pub use retries::RetryPolicy;
