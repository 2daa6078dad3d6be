//! Origin trust evaluation and the CORS layer built from it.
//!
//! # Matching Rules
//! ```text
//! no Origin header                      → allow
//! development + localhost/127.0.0.1/0.0.0.0 substring → allow
//! origin == trusted                     → allow
//! origin starts with trusted            → allow
//! origin contains trusted minus scheme  → allow
//! otherwise                             → CorsRejected
//! ```
//!
//! A rejected origin gets no `access-control-*` response headers at all,
//! preflight or not. [`origin_guard_middleware`] decides once per request
//! and scrubs whatever the CORS layer added for a rejected origin.
//!
//! The prefix and containment rules accept regional variants of a trusted
//! host, but they are not strict origin comparisons: an origin such as
//! `https://streamscene.net.attacker.example` passes. Kept as-is until the
//! intended subdomain behavior is settled.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Method, Request},
    middleware::Next,
    response::Response,
};
use thiserror::Error;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::Environment;
use crate::observability::metrics;

/// Response headers that grant a cross-origin read.
const GRANT_HEADERS: [HeaderName; 6] = [
    header::ACCESS_CONTROL_ALLOW_ORIGIN,
    header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
    header::ACCESS_CONTROL_ALLOW_METHODS,
    header::ACCESS_CONTROL_ALLOW_HEADERS,
    header::ACCESS_CONTROL_EXPOSE_HEADERS,
    header::ACCESS_CONTROL_MAX_AGE,
];

/// Methods a cross-origin caller may use.
pub const ALLOWED_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
    Method::PATCH,
];

/// Request headers a cross-origin caller may send.
pub const ALLOWED_HEADERS: [HeaderName; 4] = [
    header::CONTENT_TYPE,
    header::AUTHORIZATION,
    header::COOKIE,
    HeaderName::from_static("x-requested-with"),
];

const LOCAL_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "0.0.0.0"];

/// The declared origin is not trusted. The response carries no CORS allow
/// headers, so the browser blocks the read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("origin `{origin}` is not allowed by CORS")]
pub struct CorsRejected {
    pub origin: String,
}

/// Decides whether a declared origin may read cross-origin responses.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    trusted: Vec<String>,
    environment: Environment,
}

impl OriginPolicy {
    pub fn new(trusted: Vec<String>, environment: Environment) -> Self {
        Self {
            trusted,
            environment,
        }
    }

    pub fn trusted(&self) -> &[String] {
        &self.trusted
    }

    pub fn evaluate(&self, origin: Option<&str>) -> Result<(), CorsRejected> {
        let Some(origin) = origin else {
            return Ok(());
        };

        if !self.environment.is_production() && LOCAL_HOSTS.iter().any(|host| origin.contains(host)) {
            return Ok(());
        }

        if self.trusted.iter().any(|trusted| matches_trusted(origin, trusted)) {
            return Ok(());
        }

        if !self.environment.is_production() {
            tracing::warn!(origin = %origin, allowed = ?self.trusted, "CORS blocked origin");
        }
        metrics::record_cors_rejected();

        Err(CorsRejected {
            origin: origin.to_string(),
        })
    }

    pub fn is_allowed(&self, origin: Option<&str>) -> bool {
        self.evaluate(origin).is_ok()
    }

    /// Evaluate a raw `Origin` header value. Non-UTF-8 values are rejected.
    pub fn evaluate_header(&self, origin: Option<&HeaderValue>) -> Result<(), CorsRejected> {
        let Some(value) = origin else {
            return Ok(());
        };
        match value.to_str() {
            Ok(origin) => self.evaluate(Some(origin)),
            Err(_) => {
                metrics::record_cors_rejected();
                Err(CorsRejected {
                    origin: String::from_utf8_lossy(value.as_bytes()).into_owned(),
                })
            }
        }
    }

    /// CORS layer answering preflights and echoing allowed origins.
    ///
    /// Reuses the verdict of [`origin_guard_middleware`] when it ran.
    pub fn into_layer(self: Arc<Self>) -> CorsLayer {
        let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, parts: &Parts| {
            match parts.extensions.get::<OriginVerdict>() {
                Some(verdict) => verdict.allowed,
                None => self.evaluate_header(Some(origin)).is_ok(),
            }
        });

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_credentials(true)
            .allow_methods(ALLOWED_METHODS.to_vec())
            .allow_headers(ALLOWED_HEADERS.to_vec())
    }
}

/// Per-request origin decision, left in request extensions by the guard.
#[derive(Debug, Clone, Copy)]
struct OriginVerdict {
    allowed: bool,
}

/// Evaluates the request's origin once and strips every CORS grant from the
/// response when the origin is rejected. Must wrap the CORS layer.
pub async fn origin_guard_middleware(
    State(policy): State<Arc<OriginPolicy>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let verdict = policy.evaluate_header(request.headers().get(header::ORIGIN));
    request.extensions_mut().insert(OriginVerdict {
        allowed: verdict.is_ok(),
    });

    let mut response = next.run(request).await;
    if let Err(rejected) = verdict {
        tracing::debug!(origin = %rejected.origin, "Withholding CORS headers");
        strip_grants(response.headers_mut());
    }
    response
}

fn strip_grants(headers: &mut HeaderMap) {
    for name in GRANT_HEADERS {
        headers.remove(name);
    }
}

fn matches_trusted(origin: &str, trusted: &str) -> bool {
    if trusted.is_empty() {
        return false;
    }
    origin == trusted || origin.starts_with(trusted) || origin.contains(strip_scheme(trusted))
}

fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(env: Environment) -> OriginPolicy {
        OriginPolicy::new(vec!["https://streamscene.net".into()], env)
    }

    #[test]
    fn missing_origin_always_allowed() {
        assert!(policy(Environment::Production).is_allowed(None));
        assert!(policy(Environment::Development).is_allowed(None));
    }

    #[test]
    fn trusted_origin_allowed_everywhere() {
        for env in [Environment::Production, Environment::Development] {
            assert!(policy(env).is_allowed(Some("https://streamscene.net")));
        }
    }

    #[test]
    fn production_rejects_unknown_origin() {
        let err = policy(Environment::Production)
            .evaluate(Some("http://evil.com"))
            .unwrap_err();
        assert_eq!(err.origin, "http://evil.com");
    }

    #[test]
    fn local_origins_only_in_development() {
        for origin in ["http://localhost:5173", "http://127.0.0.1:3000", "http://0.0.0.0:8000"] {
            assert!(policy(Environment::Development).is_allowed(Some(origin)));
            assert!(!policy(Environment::Production).is_allowed(Some(origin)));
        }
    }

    #[test]
    fn prefix_and_containment_fallbacks() {
        let p = policy(Environment::Production);
        // prefix
        assert!(p.is_allowed(Some("https://streamscene.net:8443")));
        // containment, scheme ignored
        assert!(p.is_allowed(Some("http://streamscene.net")));
        assert!(p.is_allowed(Some("https://eu.streamscene.net")));
        assert!(!p.is_allowed(Some("https://streamscene.org")));
    }

    #[test]
    fn containment_admits_lookalike_hosts() {
        // Known looseness of substring matching.
        let p = policy(Environment::Production);
        assert!(p.is_allowed(Some("https://streamscene.net.attacker.example")));
    }

    #[test]
    fn non_utf8_origin_is_rejected() {
        let value = HeaderValue::from_bytes(b"https://\xffstreamscene.net").unwrap();
        assert!(policy(Environment::Development)
            .evaluate_header(Some(&value))
            .is_err());
        assert!(policy(Environment::Production).evaluate_header(None).is_ok());
    }

    #[test]
    fn grants_are_stripped() {
        let mut headers = HeaderMap::new();
        for name in GRANT_HEADERS {
            headers.insert(name, HeaderValue::from_static("x"));
        }
        headers.insert(header::VARY, HeaderValue::from_static("origin"));
        strip_grants(&mut headers);
        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::VARY));
    }

    #[test]
    fn strip_scheme_variants() {
        assert_eq!(strip_scheme("https://a.example"), "a.example");
        assert_eq!(strip_scheme("http://a.example"), "a.example");
        assert_eq!(strip_scheme("a.example"), "a.example");
    }
}
