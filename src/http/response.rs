//! Response handling.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers from backend responses
//! - Map pool exhaustion to 503 Service Unavailable

use axum::body::Body;
use axum::http::{Response as HttpResponse, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::DispatchError;
use crate::http::request::strip_hop_by_hop;

/// Body sent when no backend could serve the request.
pub const UNAVAILABLE_BODY: &str = "Service not available";

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (StatusCode::SERVICE_UNAVAILABLE, UNAVAILABLE_BODY).into_response()
    }
}

/// Prepare a backend response for the client.
pub fn downstream(mut response: HttpResponse<Body>) -> Response {
    strip_hop_by_hop(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    #[test]
    fn exhaustion_maps_to_503() {
        let response = DispatchError::RetriesExhausted { attempts: 4 }.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn downstream_drops_connection_headers() {
        let response = HttpResponse::builder()
            .header(header::CONNECTION, "close")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::empty())
            .unwrap();
        let response = downstream(response);
        assert!(!response.headers().contains_key(header::CONNECTION));
        assert!(response.headers().contains_key(header::CONTENT_TYPE));
    }
}
