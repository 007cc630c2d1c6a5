//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Track liveness (alive/down) with atomic transitions
//! - Own the forwarding capability bound to the backend's address

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use url::{Position, Url};

use crate::error::{AddressError, ForwardError};

/// Relays one request to a single upstream address.
///
/// Implementations report transport failures as [`ForwardError`]; any HTTP
/// response the backend produces, whatever its status, is a success.
pub trait Forwarder: Send + Sync + fmt::Debug {
    fn forward(&self, request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, ForwardError>>;
}

/// Normalize a configured backend address into its scheme+host+port identity.
///
/// A bare `host:port` is treated as `http://host:port`.
pub fn parse_address(raw: &str) -> Result<Url, AddressError> {
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };

    let mut url = Url::parse(&candidate).map_err(|source| AddressError::Parse {
        address: raw.to_string(),
        source,
    })?;

    if url.scheme() != "http" {
        return Err(AddressError::UnsupportedScheme {
            address: raw.to_string(),
            scheme: url.scheme().to_string(),
        });
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(AddressError::MissingHost(raw.to_string()));
    }
    if !matches!(url.path(), "" | "/") {
        return Err(AddressError::UnexpectedPath(raw.to_string()));
    }

    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// The `host:port` part of a normalized address, with the scheme's default
/// port filled in. IPv6 hosts keep their brackets.
pub fn authority(address: &Url) -> String {
    let host = &address[Position::BeforeHost..Position::AfterHost];
    match address.port_or_known_default() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    address: Url,
    alive: AtomicBool,
    forwarder: Box<dyn Forwarder>,
}

impl Backend {
    /// Create a new backend. Backends start out alive.
    pub fn new(address: Url, forwarder: Box<dyn Forwarder>) -> Self {
        Self {
            address,
            alive: AtomicBool::new(true),
            forwarder,
        }
    }

    /// The normalized address identifying this backend.
    pub fn address(&self) -> &Url {
        &self.address
    }

    /// Current liveness snapshot.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Set liveness and return the previous value.
    pub fn set_alive(&self, alive: bool) -> bool {
        self.alive.swap(alive, Ordering::SeqCst)
    }

    /// Relay one request through this backend's forwarder.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        self.forwarder.forward(request).await
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&authority(&self.address))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use axum::http::StatusCode;

    /// A forwarder that either answers with a fixed body or fails every time,
    /// after waiting `stall`.
    #[derive(Debug)]
    pub struct StubForwarder {
        pub reply: Option<&'static str>,
        pub calls: Arc<AtomicUsize>,
        pub stall: std::time::Duration,
    }

    impl Forwarder for StubForwarder {
        fn forward(&self, _request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, ForwardError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if !self.stall.is_zero() {
                    tokio::time::sleep(self.stall).await;
                }
                match self.reply {
                    Some(body) => Ok(Response::builder()
                        .status(StatusCode::OK)
                        .body(Body::from(body))
                        .unwrap()),
                    None => Err(ForwardError::Timeout(self.stall)),
                }
            })
        }
    }

    /// Build a backend whose forwarder replies with `reply`, or fails when `None`.
    pub fn stub_backend(address: &str, reply: Option<&'static str>) -> (Backend, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let forwarder = StubForwarder {
            reply,
            calls: calls.clone(),
            stall: std::time::Duration::ZERO,
        };
        (Backend::new(parse_address(address).unwrap(), Box::new(forwarder)), calls)
    }
}
