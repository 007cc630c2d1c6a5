//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing, request timeout)
//! - Build the backend pool and its forwarders from configuration
//! - Spawn the health checker next to the server
//! - Serve until the shutdown broadcast fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, DefaultBodyLimit, FromRequest, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::error::AddressError;
use crate::health::HealthChecker;
use crate::http::dispatcher::Dispatcher;
use crate::http::forwarder::{self, HttpForwarder};
use crate::http::request::{request_id, UpstreamRequest, UuidRequestId};
use crate::http::response;
use crate::load_balancer::pool::ServerPool;
use crate::observability::metrics;
use crate::resilience::RetryPolicy;

/// Slack between the dispatcher's request budget and the outer timeout layer,
/// so the dispatcher answers first when backends hang.
const TIMEOUT_GRACE: Duration = Duration::from_secs(1);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    pool: Arc<ServerPool>,
}

impl HttpServer {
    /// Create a server whose backends forward over HTTP.
    pub fn new(config: ProxyConfig) -> Result<Self, AddressError> {
        let client = forwarder::client(Duration::from_secs(config.timeouts.connect_secs));
        let forward_timeout = Duration::from_secs(config.timeouts.forward_secs);

        let pool = ServerPool::from_addresses(&config.backends, |address| {
            Box::new(HttpForwarder::new(address, client.clone(), forward_timeout))
        })?;

        Ok(Self::with_pool(config, Arc::new(pool)))
    }

    /// Create a server around an already-built pool.
    pub fn with_pool(config: ProxyConfig, pool: Arc<ServerPool>) -> Self {
        let dispatcher = Dispatcher::new(pool.clone(), RetryPolicy::from_config(&config.retries))
            .with_budget(Duration::from_secs(config.timeouts.request_secs));
        let state = AppState {
            dispatcher: Arc::new(dispatcher),
        };

        let router = Self::build_router(&config, state);
        Self { router, config, pool }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let backstop = Duration::from_secs(config.timeouts.request_secs) + TIMEOUT_GRACE;

        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TraceLayer::new_for_http())
                    .layer(TimeoutLayer::with_status_code(StatusCode::SERVICE_UNAVAILABLE, backstop))
                    .layer(DefaultBodyLimit::max(config.limits.max_body_bytes)),
            )
    }

    /// The shared backend pool.
    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }

    /// The fully layered router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Run the server and the health checker until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.pool.len(),
            "HTTP server starting"
        );

        if self.config.health_check.enabled {
            let checker = HealthChecker::from_config(self.pool.clone(), &self.config.health_check);
            tokio::spawn(checker.run(shutdown.resubscribe()));
        } else {
            tracing::info!("Health checks disabled");
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: buffer the request and hand it to the dispatcher.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(&request);
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let method = request.method().clone();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %request.uri().path(),
        "Dispatching request"
    );

    // Buffered so a failover can replay it; the body limit comes from
    // `DefaultBodyLimit` and maps to 413, any other read error to 400.
    let (parts, body) = request.into_parts();
    let body = match Bytes::from_request(Request::from_parts(parts.clone(), body), &()).await {
        Ok(bytes) => bytes,
        Err(rejection) => {
            tracing::warn!(
                request_id = %request_id,
                status = %rejection.status(),
                error = %rejection,
                "Failed to buffer request body"
            );
            let response = rejection.into_response();
            metrics::record_request(method.as_str(), response.status().as_u16(), start);
            return response;
        }
    };

    let upstream = UpstreamRequest::new(parts, body, client);
    let response = match state.dispatcher.dispatch(&upstream, &request_id).await {
        Ok(response) => response::downstream(response),
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Responding 503");
            e.into_response()
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}
