//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (ordered scan of the route table)
//!     → matcher.rs (segment-boundary prefix or exact path)
//!     → matched binding handles it, prefix stripped
//!     → otherwise fallback.rs (static asset, JSON 404, or the SPA shell)
//!
//! Route table construction (at startup):
//!     RouteBinding[] in tier order
//!     → validate tiers, prefixes, paths
//!     → freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes fixed at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - First match wins; a request is handled by at most one binding

pub mod fallback;
pub mod matcher;
pub mod router;

pub use fallback::{FallbackResolver, Resolution};
pub use matcher::{ExactPathMatcher, Matcher, PathPrefixMatcher};
pub use router::{MountPoint, RouteBinding, RouteTable, RouteTableError, Tier};
