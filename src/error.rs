//! Error taxonomy for the balancer.
//!
//! Backend-level failures ([`ForwardError`], [`ProbeError`]) are absorbed and
//! turned into liveness changes. Only [`DispatchError`] reaches the request
//! boundary, where it becomes a 503.

use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

/// A backend address that could not be normalized.
#[derive(Debug, Error)]
pub enum AddressError {
    #[error("invalid backend address {address:?}: {source}")]
    Parse {
        address: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported scheme {scheme:?} in backend address {address:?} (only http is supported)")]
    UnsupportedScheme { address: String, scheme: String },

    #[error("backend address {0:?} has no host")]
    MissingHost(String),

    #[error("backend address {0:?} must not contain a path")]
    UnexpectedPath(String),
}

/// A forwarding attempt to one backend did not complete.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Connection refused, reset, or any other transport-level error.
    #[error("upstream transport error: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    /// The backend did not produce response headers in time.
    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    /// The upstream URI could not be assembled from the backend address.
    #[error("invalid upstream uri: {0}")]
    InvalidUri(#[from] axum::http::uri::InvalidUri),
}

/// A health probe did not succeed.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("unreachable: {0}")]
    Unreachable(#[from] std::io::Error),

    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("unhealthy status {0}")]
    Status(StatusCode),

    #[error("probe request failed: {0}")]
    Request(String),
}

/// No backend could serve the request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// Every backend is currently marked down.
    #[error("no alive backend available after {attempts} failed attempt(s)")]
    NoAlivePeer { attempts: u32 },

    /// The retry ceiling was reached while backends kept failing.
    #[error("retry ceiling reached after {attempts} failed attempt(s)")]
    RetriesExhausted { attempts: u32 },
}

impl DispatchError {
    /// Number of forwarding attempts that failed before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            DispatchError::NoAlivePeer { attempts } | DispatchError::RetriesExhausted { attempts } => *attempts,
        }
    }
}
