//! HTTP forwarding to a single backend.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, Uri};
use futures_util::future::BoxFuture;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time;
use url::Url;

use crate::error::ForwardError;
use crate::load_balancer::backend::{authority, Forwarder};

/// Build the shared upstream client.
pub fn client(connect_timeout: Duration) -> Client<HttpConnector, Body> {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(connect_timeout));
    Client::builder(TokioExecutor::new()).build(connector)
}

fn into_axum(response: Response<Incoming>) -> Response<Body> {
    response.map(Body::new)
}

/// Forwards requests to one backend over a shared hyper client.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    authority: String,
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl HttpForwarder {
    pub fn new(target: &Url, client: Client<HttpConnector, Body>, timeout: Duration) -> Self {
        Self {
            authority: authority(target),
            client,
            timeout,
        }
    }

    fn upstream_uri(&self, uri: &Uri) -> Result<Uri, ForwardError> {
        let path = uri.path_and_query().map_or("/", |p| p.as_str());
        Ok(format!("http://{}{}", self.authority, path).parse()?)
    }
}

impl Forwarder for HttpForwarder {
    fn forward(&self, mut request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, ForwardError>> {
        Box::pin(async move {
            *request.uri_mut() = self.upstream_uri(request.uri())?;

            match time::timeout(self.timeout, self.client.request(request)).await {
                Ok(Ok(response)) => Ok(into_axum(response)),
                Ok(Err(e)) => Err(ForwardError::Transport(e)),
                Err(_) => Err(ForwardError::Timeout(self.timeout)),
            }
        })
    }
}
