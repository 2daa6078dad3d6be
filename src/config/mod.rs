//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     → optional TOML file (loader.rs)
//!     → process environment overlay (loader.rs)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup and never revalidated per request
//! - All fields have defaults to allow minimal configs
//! - Malformed origins fail fast instead of being filtered at request time
//! - The environment flag is resolved once and threaded explicitly

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    DatabaseConfig, Environment, GatewayConfig, ListenerConfig, ObservabilityConfig,
    OriginConfig, ProxyConfig, SessionConfig, StaticConfig,
};
