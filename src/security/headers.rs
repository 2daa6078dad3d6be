//! Forwarding header normalization.
//!
//! # Responsibilities
//! - Rewrite `x-forwarded-proto` from the intermediary's visitor metadata
//! - Resolve the effective protocol and client IP honoring the trusted hop count
//! - Attach the Request Context before any protocol-dependent decision
//!
//! # Design Decisions
//! - Malformed visitor metadata is a no-op, never a request error
//! - Forwarding headers are only honored for the configured number of hops

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

use crate::config::ProxyConfig;
use crate::http::request::{Protocol, RequestContext};

pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Visitor metadata as sent by the intermediary, e.g. `{"scheme":"https"}`.
#[derive(Debug, Deserialize)]
struct VisitorMetadata {
    scheme: Option<String>,
}

/// Proxy trust settings resolved at startup.
#[derive(Debug, Clone)]
pub struct ProxyTrust {
    visitor_header: HeaderName,
    trust_hops: usize,
}

impl ProxyTrust {
    pub fn new(visitor_header: HeaderName, trust_hops: usize) -> Self {
        Self {
            visitor_header,
            trust_hops,
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self, axum::http::header::InvalidHeaderName> {
        let visitor_header = HeaderName::try_from(config.visitor_header.as_str())?;
        Ok(Self::new(visitor_header, config.trust_hops))
    }

    /// Rewrite `x-forwarded-proto` to `https` when the visitor metadata says
    /// the client connected over TLS. Returns whether a rewrite happened.
    pub fn normalize(&self, headers: &mut HeaderMap) -> bool {
        let Some(raw) = headers.get(&self.visitor_header) else {
            return false;
        };

        let scheme = raw
            .to_str()
            .ok()
            .and_then(|value| serde_json::from_str::<VisitorMetadata>(value).ok())
            .and_then(|metadata| metadata.scheme);

        match scheme.as_deref() {
            Some("https") => {
                headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("https"));
                true
            }
            _ => false,
        }
    }

    /// Effective protocol of the client connection.
    pub fn protocol(&self, headers: &HeaderMap) -> Protocol {
        if self.trust_hops == 0 {
            return Protocol::Http;
        }
        let forwarded = headers
            .get(X_FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim);

        match forwarded {
            Some(proto) if proto.eq_ignore_ascii_case("https") => Protocol::Https,
            _ => Protocol::Http,
        }
    }

    /// Client IP: the peer address, or the forwarded address reached after
    /// walking back through `trust_hops` trusted intermediaries.
    pub fn client_ip(&self, headers: &HeaderMap, peer: Option<IpAddr>) -> Option<IpAddr> {
        let forwarded: Vec<IpAddr> = headers
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .map(|v| {
                v.split(',')
                    .filter_map(|addr| addr.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_default();

        let Some(peer) = peer else {
            return forwarded.last().copied();
        };

        let chain: Vec<IpAddr> = std::iter::once(peer)
            .chain(forwarded.into_iter().rev())
            .collect();
        let index = self.trust_hops.min(chain.len() - 1);
        Some(chain[index])
    }
}

/// Middleware normalizing forwarding headers and attaching the Request Context.
pub async fn proxy_headers_middleware(
    State(trust): State<Arc<ProxyTrust>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if trust.normalize(request.headers_mut()) {
        tracing::trace!("x-forwarded-proto rewritten from visitor metadata");
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let protocol = trust.protocol(request.headers());
    let client_ip = trust.client_ip(request.headers(), peer);

    let context = RequestContext::from_request(&request, protocol, client_ip);
    request.extensions_mut().insert(context);

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trust() -> ProxyTrust {
        ProxyTrust::new(HeaderName::from_static("cf-visitor"), 1)
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(HeaderName::from_static(k), HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn https_visitor_rewrites_forwarded_proto() {
        let mut h = headers(&[("cf-visitor", r#"{"scheme":"https"}"#), ("x-forwarded-proto", "http")]);
        assert!(trust().normalize(&mut h));
        assert_eq!(h.get(X_FORWARDED_PROTO).unwrap(), "https");
        assert_eq!(trust().protocol(&h), Protocol::Https);
    }

    #[test]
    fn http_visitor_is_left_alone() {
        let mut h = headers(&[("cf-visitor", r#"{"scheme":"http"}"#), ("x-forwarded-proto", "http")]);
        assert!(!trust().normalize(&mut h));
        assert_eq!(h.get(X_FORWARDED_PROTO).unwrap(), "http");
    }

    #[test]
    fn malformed_visitor_is_absorbed() {
        let mut h = headers(&[("cf-visitor", "not-json"), ("x-forwarded-proto", "http")]);
        assert!(!trust().normalize(&mut h));
        assert_eq!(h.get(X_FORWARDED_PROTO).unwrap(), "http");

        let mut h = headers(&[("cf-visitor", r#"{"scheme":42}"#)]);
        assert!(!trust().normalize(&mut h));
        assert!(h.get(X_FORWARDED_PROTO).is_none());
    }

    #[test]
    fn untrusted_hops_ignore_forwarded_proto() {
        let h = headers(&[("x-forwarded-proto", "https")]);
        let direct = ProxyTrust::new(HeaderName::from_static("cf-visitor"), 0);
        assert_eq!(direct.protocol(&h), Protocol::Http);
        assert_eq!(trust().protocol(&h), Protocol::Https);
    }

    #[test]
    fn first_forwarded_proto_value_wins() {
        let h = headers(&[("x-forwarded-proto", "https, http")]);
        assert_eq!(trust().protocol(&h), Protocol::Https);
    }

    #[test]
    fn client_ip_walks_trusted_hops() {
        let h = headers(&[("x-forwarded-for", "203.0.113.7, 10.0.0.2")]);
        let peer: IpAddr = "10.0.0.1".parse().unwrap();

        assert_eq!(trust().client_ip(&h, Some(peer)), Some("10.0.0.2".parse().unwrap()));

        let two = ProxyTrust::new(HeaderName::from_static("cf-visitor"), 2);
        assert_eq!(two.client_ip(&h, Some(peer)), Some("203.0.113.7".parse().unwrap()));

        let many = ProxyTrust::new(HeaderName::from_static("cf-visitor"), 10);
        assert_eq!(many.client_ip(&h, Some(peer)), Some("203.0.113.7".parse().unwrap()));

        let none = ProxyTrust::new(HeaderName::from_static("cf-visitor"), 0);
        assert_eq!(none.client_ip(&h, Some(peer)), Some(peer));
    }
}
