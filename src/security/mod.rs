//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (normalize forwarded protocol, attach Request Context)
//!     → cors.rs (origin trust, preflight handling)
//!     → Pass to the session chain
//! ```
//!
//! # Design Decisions
//! - Header normalization runs before any protocol-dependent decision
//! - Origin rejection withholds CORS headers instead of failing the request
//! - Environment-dependent behavior is fixed when the layers are built

pub mod cors;
pub mod headers;

pub use cors::{origin_guard_middleware, CorsRejected, OriginPolicy};
pub use headers::{proxy_headers_middleware, ProxyTrust};
