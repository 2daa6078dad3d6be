//! Session & identity subsystem.
//!
//! # Data Flow
//! ```text
//! Request (Cookie header, RequestContext)
//!     → cookie.rs (verify signed session id)
//!     → store.rs (load record, or start a fresh one)
//!     → identity.rs (resolve identity reference → CurrentUser)
//!     → handle.rs (Session in request extensions)
//!     → handler runs
//!     → middleware.rs commit (save/destroy, Set-Cookie)
//! ```
//!
//! # Design Decisions
//! - Cookie attributes are fixed from the environment at construction
//! - Expiry is fixed at issuance; activity never extends it
//! - Establishes identity only; authorization stays with handlers

pub mod cookie;
pub mod handle;
pub mod identity;
pub mod middleware;
pub mod store;

pub use cookie::CookieAttributes;
pub use handle::Session;
pub use identity::{CurrentUser, Identity, IdentityError, IdentityResolver, MemoryDirectory};
pub use middleware::{session_middleware, SessionManager};
pub use store::{MemoryStore, SessionError, SessionId, SessionRecord, SessionStore};
