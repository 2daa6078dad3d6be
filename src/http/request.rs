//! Per-request context and request-scoped middleware.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4) and echo it on the response
//! - Carry the Request Context (origin, path, method, resolved protocol)
//! - Development-only request logging
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The context lives in request extensions; nothing is shared across requests

use std::fmt;
use std::net::IpAddr;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, Method, Request},
    middleware::Next,
    response::Response,
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::config::Environment;
use crate::session::CurrentUser;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Layer assigning an `x-request-id` to requests that lack one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Layer copying the request's `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// Effective scheme of the client's original connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }

    pub fn is_secure(self) -> bool {
        matches!(self, Protocol::Https)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request data established by the gateway before dispatch.
///
/// Created by the proxy header middleware once headers are normalized and
/// read by everything downstream. Raw headers stay on the request itself.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub origin: Option<String>,
    pub path: String,
    pub method: Method,
    pub protocol: Protocol,
    pub client_ip: Option<IpAddr>,
}

impl RequestContext {
    pub fn from_request<B>(req: &Request<B>, protocol: Protocol, client_ip: Option<IpAddr>) -> Self {
        Self {
            origin: req
                .headers()
                .get(header::ORIGIN)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            path: req.uri().path().to_string(),
            method: req.method().clone(),
            protocol,
            client_ip,
        }
    }
}

/// Logs every request with its origin and authentication state.
///
/// Installed for every deployment but silent in production.
pub async fn request_log_middleware(
    State(environment): State<Environment>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !environment.is_production() {
        let origin = request
            .headers()
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        let user = if request.extensions().get::<CurrentUser>().is_some() {
            "authenticated"
        } else {
            "not authenticated"
        };
        tracing::debug!(
            method = %request.method(),
            path = %request.uri().path(),
            origin = %origin,
            user = user,
            "Request"
        );
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_captures_origin_and_path() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/ai/generate?x=1")
            .header("Origin", "https://streamscene.net")
            .body(())
            .unwrap();
        let ctx = RequestContext::from_request(&req, Protocol::Https, None);
        assert_eq!(ctx.origin.as_deref(), Some("https://streamscene.net"));
        assert_eq!(ctx.path, "/api/ai/generate");
        assert_eq!(ctx.method, Method::POST);
        assert!(ctx.protocol.is_secure());
    }

    #[test]
    fn context_without_origin() {
        let req = Request::builder().uri("/").body(()).unwrap();
        let ctx = RequestContext::from_request(&req, Protocol::Http, None);
        assert!(ctx.origin.is_none());
        assert_eq!(ctx.protocol.to_string(), "http");
    }
}
