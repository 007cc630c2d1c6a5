//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rr_balancer::{HttpServer, ProxyConfig, ServerPool, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Start a mock backend that always answers 200 with `body`.
/// Aborting the returned handle closes the listening socket.
pub async fn start_mock_backend(body: &'static str) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (addr, serve(listener, move || async move { (200, body.to_string()) }))
}

/// Start a mock backend on a specific address.
#[allow(dead_code)]
pub async fn start_mock_backend_at(addr: SocketAddr, body: &'static str) -> JoinHandle<()> {
    let listener = TcpListener::bind(addr).await.unwrap();
    serve(listener, move || async move { (200, body.to_string()) })
}

/// Start a programmable mock backend.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, JoinHandle<()>)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (addr, serve(listener, f))
}

fn serve<F, Fut>(listener: TcpListener, f: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let f = Arc::new(f);
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let (status, body) = f().await;
                respond(socket, status, &body).await;
            });
        }
    })
}

async fn respond(mut socket: TcpStream, status: u16, body: &str) {
    // Read the request head before answering so the client never sees a reset.
    let mut buf = [0u8; 4096];
    let _ = socket.read(&mut buf).await;

    let status_text = match status {
        200 => "200 OK",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Start a backend that accepts connections and never answers.
#[allow(dead_code)]
pub async fn start_silent_backend() -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                while let Ok(n) = socket.read(&mut buf).await {
                    if n == 0 {
                        break;
                    }
                }
            });
        }
    });
    (addr, handle)
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Config pointing at `backends`, with retry delays removed for speed.
pub fn config_for(backends: &[SocketAddr]) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.backends = backends.iter().map(|addr| format!("http://{}", addr)).collect();
    config.retries.base_delay_ms = 0;
    config.timeouts.forward_secs = 2;
    config.timeouts.connect_secs = 1;
    config.health_check.enabled = false;
    config
}

/// A running balancer.
pub struct Proxy {
    pub url: String,
    pub pool: Arc<ServerPool>,
    pub shutdown: Shutdown,
}

/// Start the balancer on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig) -> Proxy {
    let server = HttpServer::new(config).expect("valid backend addresses");
    let pool = server.pool().clone();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    Proxy {
        url: format!("http://{}", addr),
        pool,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
