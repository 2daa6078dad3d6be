//! Route priority table and dispatch.
//!
//! # Responsibilities
//! - Store route bindings in their registration order
//! - Look up the first binding matching a request path
//! - Hand the request to the bound handler with the mount prefix stripped
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) ordered scan; first match wins, handlers are never combined
//! - Tiers may not regress: auth, then application, then API, then diagnostics
//! - Explicit no-match rather than silent default

use std::fmt;

use axum::{
    body::Body,
    extract::OriginalUri,
    http::{Request, Uri},
    response::Response,
    Router,
};
use thiserror::Error;
use tower::ServiceExt;

use crate::http::response::route_not_found;
use crate::routing::matcher::{ExactPathMatcher, Matcher, PathPrefixMatcher};

/// Precedence tier of a binding. Bindings must be registered in
/// non-decreasing tier order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    /// Authentication flows (local and social).
    Auth,
    /// The general application route set.
    Application,
    /// Functional API domains under reserved prefixes.
    Api,
    /// Liveness and other diagnostics.
    Diagnostic,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Auth => "auth",
            Tier::Application => "application",
            Tier::Api => "api",
            Tier::Diagnostic => "diagnostic",
        };
        f.write_str(name)
    }
}

/// Where a binding is mounted.
#[derive(Debug, Clone)]
pub enum MountPoint {
    /// Everything under a prefix; the prefix is stripped before dispatch.
    Prefix(PathPrefixMatcher),
    /// A fixed set of paths, dispatched unchanged.
    Paths(ExactPathMatcher),
}

impl MountPoint {
    fn matcher(&self) -> &dyn Matcher {
        match self {
            MountPoint::Prefix(m) => m as &dyn Matcher,
            MountPoint::Paths(m) => m as &dyn Matcher,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteTableError {
    #[error("binding `{name}` ({tier}) registered after a {previous} binding")]
    TierOrder {
        name: String,
        tier: Tier,
        previous: Tier,
    },

    #[error("binding `{name}` has prefix `{prefix}`, which must start with `/` and not be the root")]
    InvalidPrefix { name: String, prefix: String },

    #[error("prefix `{0}` is bound more than once")]
    DuplicatePrefix(String),

    #[error("binding `{name}` has invalid path `{path}`")]
    InvalidPath { name: String, path: String },

    #[error("binding `{0}` mounts no paths")]
    EmptyPaths(String),
}

/// An ordered (mount point, handler) pair.
#[derive(Debug, Clone)]
pub struct RouteBinding {
    name: String,
    tier: Tier,
    mount: MountPoint,
    service: Router,
}

impl RouteBinding {
    /// Mount `router` under `prefix`. Unknown sub-paths answer with the
    /// structured not-found body.
    pub fn prefix(
        name: impl Into<String>,
        tier: Tier,
        prefix: impl Into<String>,
        router: Router,
    ) -> Self {
        Self {
            name: name.into(),
            tier,
            mount: MountPoint::Prefix(PathPrefixMatcher::new(prefix)),
            service: router.fallback(|| async { route_not_found() }),
        }
    }

    /// Mount `router` for exactly the given paths.
    pub fn paths<I, S>(name: impl Into<String>, tier: Tier, paths: I, router: Router) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            tier,
            mount: MountPoint::Paths(ExactPathMatcher::new(paths)),
            service: router,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn mount(&self) -> &MountPoint {
        &self.mount
    }

    pub fn matches(&self, path: &str) -> bool {
        self.mount.matcher().matches(path)
    }

    /// Dispatch a request to the bound handler.
    pub async fn call(&self, mut request: Request<Body>) -> Response {
        let original = request.uri().clone();
        let path = self.mount.matcher().rewrite(original.path());

        if path != original.path() {
            let path_and_query = match original.query() {
                Some(query) => format!("{path}?{query}"),
                None => path.to_string(),
            };
            match Uri::builder().path_and_query(path_and_query).build() {
                Ok(uri) => {
                    if request.extensions().get::<OriginalUri>().is_none() {
                        request.extensions_mut().insert(OriginalUri(original.clone()));
                    }
                    *request.uri_mut() = uri;
                }
                Err(e) => {
                    tracing::warn!(binding = %self.name, error = %e, "Could not strip mount prefix");
                }
            }
        }

        match self.service.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }

    fn validate(&self) -> Result<(), RouteTableError> {
        match &self.mount {
            MountPoint::Prefix(m) => {
                let prefix = m.prefix();
                if prefix.is_empty() || !prefix.starts_with('/') {
                    return Err(RouteTableError::InvalidPrefix {
                        name: self.name.clone(),
                        prefix: prefix.to_string(),
                    });
                }
            }
            MountPoint::Paths(m) => {
                if m.paths().is_empty() {
                    return Err(RouteTableError::EmptyPaths(self.name.clone()));
                }
                if let Some(path) = m.paths().iter().find(|p| !p.starts_with('/')) {
                    return Err(RouteTableError::InvalidPath {
                        name: self.name.clone(),
                        path: path.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Immutable ordered list of route bindings.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    bindings: Vec<RouteBinding>,
}

impl RouteTable {
    /// Freeze `bindings` in the given order after validating it.
    pub fn new(bindings: Vec<RouteBinding>) -> Result<Self, RouteTableError> {
        let mut previous: Option<Tier> = None;
        let mut prefixes: Vec<&str> = Vec::new();

        for binding in &bindings {
            binding.validate()?;

            if let Some(previous) = previous.filter(|p| binding.tier < *p) {
                return Err(RouteTableError::TierOrder {
                    name: binding.name.clone(),
                    tier: binding.tier,
                    previous,
                });
            }
            previous = Some(binding.tier);

            if let MountPoint::Prefix(m) = &binding.mount {
                if prefixes.contains(&m.prefix()) {
                    return Err(RouteTableError::DuplicatePrefix(m.prefix().to_string()));
                }
                prefixes.push(m.prefix());
            }
        }

        Ok(Self { bindings })
    }

    /// First binding matching `path`, in registration order.
    pub fn resolve(&self, path: &str) -> Option<&RouteBinding> {
        self.bindings.iter().find(|binding| binding.matches(path))
    }

    pub fn bindings(&self) -> &[RouteBinding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Prefixes of auth and API bindings, as `"/prefix/"`. Paths under them
    /// never fall back to the single-page shell.
    pub fn reserved_prefixes(&self) -> Vec<String> {
        self.bindings
            .iter()
            .filter(|b| matches!(b.tier, Tier::Auth | Tier::Api))
            .filter_map(|b| match &b.mount {
                MountPoint::Prefix(m) => Some(format!("{}/", m.prefix())),
                MountPoint::Paths(_) => None,
            })
            .collect()
    }
}
