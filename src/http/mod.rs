//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, catch-all handler)
//!     → request.rs (request ID, buffer body, strip hop-by-hop headers)
//!     → dispatcher.rs (pick peer, forward, fail over)
//!     → forwarder.rs (hyper client call to the chosen backend)
//!     → response.rs (strip hop-by-hop headers, or 503)
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod forwarder;
pub mod request;
pub mod response;
pub mod server;

pub use dispatcher::Dispatcher;
pub use forwarder::HttpForwarder;
pub use request::{UpstreamRequest, X_REQUEST_ID};
pub use server::HttpServer;
