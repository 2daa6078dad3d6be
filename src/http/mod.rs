//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (middleware chain, dispatch)
//!     → request.rs (request ID, Request Context, development log)
//!     → [routing decides binding or fallback]
//!     → response.rs (structured error bodies)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{Protocol, RequestContext, X_REQUEST_ID};
pub use response::ErrorBody;
pub use server::{Gateway, GatewayBuilder, GatewayError};
