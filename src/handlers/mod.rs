//! Built-in handlers mounted by the gateway or its binary.
//!
//! - `diagnostic`: liveness endpoint, always bound last
//! - `auth`: session status and logout under the auth prefix
//! - `app`: the general application set, a stand-in until its handlers are linked
//! - `unavailable`: stand-in for domains whose handlers are not linked in

pub mod auth;
pub mod diagnostic;
pub mod unavailable;

pub use diagnostic::{liveness_binding, LIVENESS_MESSAGE};
pub use unavailable::unavailable;

use crate::routing::{RouteBinding, Tier};

/// Functional API domains and their reserved prefixes, in mount order.
pub const API_DOMAINS: [(&str, &str); 10] = [
    ("ai", "/api/ai"),
    ("schedule", "/api/schedule"),
    ("content-scheduler", "/api/content-scheduler"),
    ("tasks", "/api/tasks"),
    ("s3", "/api/s3"),
    ("files", "/api/files"),
    ("shares", "/api/shares"),
    ("budget", "/api/budget"),
    ("threads", "/api/threads"),
    ("caption", "/api/caption"),
];

/// Paths served by the general application route set.
pub const APPLICATION_PATHS: [&str; 2] = ["/api/user", "/api/profile"];

/// The binary's standard route set: auth, social auth, the general
/// application set, then every API domain.
pub fn standard_bindings() -> Vec<RouteBinding> {
    let mut bindings = vec![
        RouteBinding::prefix("auth", Tier::Auth, "/auth", auth::router()),
        RouteBinding::prefix("social", Tier::Auth, "/social", unavailable("social")),
        RouteBinding::paths("app", Tier::Application, APPLICATION_PATHS, unavailable("app")),
    ];
    bindings.extend(
        API_DOMAINS
            .iter()
            .map(|(name, prefix)| RouteBinding::prefix(*name, Tier::Api, *prefix, unavailable(name))),
    );
    bindings
}
