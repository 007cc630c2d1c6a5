//! Reachability probes.
//!
//! # Responsibilities
//! - Decide whether one backend address is reachable
//! - Bound every probe with its own timeout so one dead backend cannot
//!   stall a sweep

use std::fmt;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use futures_util::future::BoxFuture;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpStream;
use tokio::time;
use url::Url;

use crate::config::{HealthCheckConfig, ProbeMode};
use crate::error::ProbeError;
use crate::load_balancer::backend::authority;

/// Checks whether a backend address is reachable.
pub trait Probe: Send + Sync + fmt::Debug {
    fn probe<'a>(&'a self, address: &'a Url) -> BoxFuture<'a, Result<(), ProbeError>>;
}

/// Build the probe selected by the health check configuration.
pub fn from_config(config: &HealthCheckConfig) -> Box<dyn Probe> {
    let timeout = Duration::from_secs(config.timeout_secs);
    match config.mode {
        ProbeMode::Tcp => Box::new(TcpProbe::new(timeout)),
        ProbeMode::Http => Box::new(HttpProbe::new(config.path.clone(), timeout)),
    }
}

/// Succeeds when a TCP connection to the backend can be opened.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Probe for TcpProbe {
    fn probe<'a>(&'a self, address: &'a Url) -> BoxFuture<'a, Result<(), ProbeError>> {
        Box::pin(async move {
            let target = authority(address);
            match time::timeout(self.timeout, TcpStream::connect(target.as_str())).await {
                Ok(Ok(_stream)) => Ok(()),
                Ok(Err(e)) => Err(ProbeError::Unreachable(e)),
                Err(_) => Err(ProbeError::Timeout(self.timeout)),
            }
        })
    }
}

/// Succeeds when `GET <address><path>` answers with a 2xx status.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client<HttpConnector, Body>,
    path: String,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(path: String, timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client, path, timeout }
    }
}

impl Probe for HttpProbe {
    fn probe<'a>(&'a self, address: &'a Url) -> BoxFuture<'a, Result<(), ProbeError>> {
        Box::pin(async move {
            let uri = format!("http://{}{}", authority(address), self.path);
            let request = Request::builder()
                .method("GET")
                .uri(uri)
                .header("user-agent", "rr-balancer-health-check")
                .body(Body::empty())
                .map_err(|e| ProbeError::Request(e.to_string()))?;

            match time::timeout(self.timeout, self.client.request(request)).await {
                Ok(Ok(response)) if response.status().is_success() => Ok(()),
                Ok(Ok(response)) => Err(ProbeError::Status(response.status())),
                Ok(Err(e)) => Err(ProbeError::Request(e.to_string())),
                Err(_) => Err(ProbeError::Timeout(self.timeout)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::backend::parse_address;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn closed_port() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr
    }

    #[tokio::test]
    async fn tcp_probe_reports_reachability() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let up = parse_address(&listener.local_addr().unwrap().to_string()).unwrap();
        let down = parse_address(&closed_port().await.to_string()).unwrap();

        let probe = TcpProbe::new(Duration::from_secs(1));
        assert!(probe.probe(&up).await.is_ok());
        assert!(matches!(probe.probe(&down).await, Err(ProbeError::Unreachable(_))));
    }

    #[tokio::test]
    async fn http_probe_requires_success_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = parse_address(&listener.local_addr().unwrap().to_string()).unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                    .await;
                let _ = socket.shutdown().await;
            }
        });

        let probe = HttpProbe::new("/health".into(), Duration::from_secs(1));
        assert!(matches!(probe.probe(&address).await, Err(ProbeError::Status(status)) if status.as_u16() == 500));
    }

    #[test]
    fn config_selects_probe_kind() {
        let mut config = HealthCheckConfig::default();
        assert!(format!("{:?}", from_config(&config)).starts_with("TcpProbe"));
        config.mode = ProbeMode::Http;
        assert!(format!("{:?}", from_config(&config)).starts_with("HttpProbe"));
    }
}
