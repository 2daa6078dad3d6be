//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files; the
//! process environment is layered on top by `loader.rs`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Port used when `PORT` is unset, non-numeric or zero.
pub const DEFAULT_PORT: u16 = 8000;

/// Session secret used when none is configured. Only acceptable outside production.
pub const FALLBACK_SESSION_SECRET: &str = "fallback-secret-key-change-in-production";

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Deployment environment, resolved once at startup.
    pub environment: Environment,

    /// Listener configuration (bind host and port).
    pub listener: ListenerConfig,

    /// Sources of the trusted origin set.
    pub origins: OriginConfig,

    /// Session cookie and store settings.
    pub session: SessionConfig,

    /// Trusted intermediary settings.
    pub proxy: ProxyConfig,

    /// Static asset and single-page shell settings.
    pub static_files: StaticConfig,

    /// Backing store readiness settings.
    pub database: DatabaseConfig,

    /// Request limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Liveness endpoint path.
    pub liveness_path: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            listener: ListenerConfig::default(),
            origins: OriginConfig::default(),
            session: SessionConfig::default(),
            proxy: ProxyConfig::default(),
            static_files: StaticConfig::default(),
            database: DatabaseConfig::default(),
            limits: LimitsConfig::default(),
            observability: ObservabilityConfig::default(),
            liveness_path: "/test-server".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Build the ordered trusted origin set.
    ///
    /// Order: client URL, frontend URL, fixed domains, additional origins.
    /// Blank entries are dropped; duplicates are kept.
    pub fn trusted_origins(&self) -> Vec<String> {
        self.origins
            .client_url
            .iter()
            .chain(self.origins.frontend_url.iter())
            .chain(self.origins.fixed.iter())
            .chain(self.origins.additional.iter())
            .map(|origin| origin.trim())
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    #[default]
    Development,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Development => "development",
        }
    }
}

impl FromStr for Environment {
    type Err = std::convert::Infallible;

    /// Anything other than `production` is a development deployment.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("production") {
            Ok(Environment::Production)
        } else {
            Ok(Environment::Development)
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (all interfaces by default).
    pub host: String,

    /// TCP port.
    pub port: u16,
}

impl ListenerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Inputs of the trusted origin set.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Primary client URL.
    pub client_url: Option<String>,

    /// Secondary frontend URL.
    pub frontend_url: Option<String>,

    /// Fixed production domains.
    pub fixed: Vec<String>,

    /// Additional origins (comma-separated in the environment).
    pub additional: Vec<String>,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            client_url: None,
            frontend_url: None,
            fixed: vec![
                "https://streamscene.net".to_string(),
                "https://www.streamscene.net".to_string(),
            ],
            additional: Vec::new(),
        }
    }
}

/// Session settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Secret used to sign session cookies.
    pub secret: String,

    /// Cookie carrying the session identifier.
    pub cookie_name: String,

    /// Fixed lifetime of a session from issuance.
    pub ttl_hours: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: FALLBACK_SESSION_SECRET.to_string(),
            cookie_name: "gateway.sid".to_string(),
            ttl_hours: 24,
        }
    }
}

/// Trusted intermediary settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Number of intermediary hops whose forwarding headers are honored.
    pub trust_hops: usize,

    /// Header carrying the intermediary's visitor metadata (JSON).
    pub visitor_header: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            trust_hops: 1,
            visitor_header: "cf-visitor".to_string(),
        }
    }
}

/// Static asset settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticConfig {
    /// Directory holding the built frontend.
    pub public_dir: PathBuf,

    /// Entry document of the single-page application.
    pub index_file: String,

    /// Path prefixes that never fall back to the single-page shell.
    pub reserved_prefixes: Vec<String>,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            public_dir: PathBuf::from("public"),
            index_file: "index.html".to_string(),
            reserved_prefixes: vec![
                "/api/".to_string(),
                "/auth/".to_string(),
                "/social/".to_string(),
            ],
        }
    }
}

/// Backing store readiness settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL; readiness is skipped when absent.
    pub url: Option<String>,

    /// Readiness check timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            connect_timeout_secs: 5,
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size accepted by body extractors.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
