//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Trusted origins must be absolute http(s) URLs with a host
//! - Validate value ranges (TTL > 0, paths rooted at `/`)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, FALLBACK_SESSION_SECRET};

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("trusted origin `{origin}` is not a valid URL: {reason}")]
    MalformedOrigin { origin: String, reason: String },

    #[error("trusted origin `{0}` must use http or https")]
    OriginScheme(String),

    #[error("trusted origin `{0}` has no host")]
    OriginHost(String),

    #[error("session secret must not be empty")]
    EmptySessionSecret,

    #[error("session cookie name must not be empty")]
    EmptyCookieName,

    #[error("session ttl must be greater than zero")]
    ZeroSessionTtl,

    #[error("{field} `{value}` must start with `/`")]
    UnrootedPath { field: &'static str, value: String },
}

/// Validate a loaded configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for origin in config.trusted_origins() {
        if let Err(e) = validate_origin(&origin) {
            errors.push(e);
        }
    }

    if config.session.secret.is_empty() {
        errors.push(ValidationError::EmptySessionSecret);
    }
    if config.session.cookie_name.trim().is_empty() {
        errors.push(ValidationError::EmptyCookieName);
    }
    if config.session.ttl_hours == 0 {
        errors.push(ValidationError::ZeroSessionTtl);
    }

    if !config.liveness_path.starts_with('/') {
        errors.push(ValidationError::UnrootedPath {
            field: "liveness_path",
            value: config.liveness_path.clone(),
        });
    }
    for prefix in &config.static_files.reserved_prefixes {
        if !prefix.starts_with('/') {
            errors.push(ValidationError::UnrootedPath {
                field: "reserved prefix",
                value: prefix.clone(),
            });
        }
    }

    if config.environment.is_production() && config.session.secret == FALLBACK_SESSION_SECRET {
        tracing::warn!("SESSION_SECRET is not set; production sessions are signed with the fallback secret");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_origin(origin: &str) -> Result<(), ValidationError> {
    let url = Url::parse(origin).map_err(|e| ValidationError::MalformedOrigin {
        origin: origin.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ValidationError::OriginScheme(origin.to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ValidationError::OriginHost(origin.to_string()));
    }
    Ok(())
}
