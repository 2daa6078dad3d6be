//! Edge gateway for a single-page application and its API.
//!
//! One listener serves the auth flows, the API domains, static assets and
//! the application shell. Every request passes the same chain: proxy header
//! normalization, origin trust, session and identity, then exactly one
//! route binding or the fallback tier.

pub mod config;
pub mod handlers;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;
pub mod session;

pub use config::GatewayConfig;
pub use http::{Gateway, GatewayBuilder, GatewayError};
pub use lifecycle::Shutdown;
