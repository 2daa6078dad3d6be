//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{Environment, GatewayConfig, DEFAULT_PORT};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, overlay and validate configuration.
///
/// Defaults come first, then the optional TOML file, then the process
/// environment. The result is validated before it is returned.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    apply_env(&mut config, |key| std::env::var(key).ok());
    finalize(config)
}

/// Resolve paths and validate an assembled configuration.
pub fn finalize(mut config: GatewayConfig) -> Result<GatewayConfig, ConfigError> {
    config.static_files.public_dir = absolute_dir(&config.static_files.public_dir)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` abstracts the environment so tests do not mutate process state.
pub fn apply_env<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(env) = lookup("APP_ENV").or_else(|| lookup("NODE_ENV")) {
        config.environment = env.parse().unwrap_or(Environment::Development);
    }

    if let Some(port) = lookup("PORT") {
        config.listener.port = parse_port(&port);
    }

    if let Some(url) = lookup("CLIENT_URL") {
        config.origins.client_url = Some(url);
    }
    if let Some(url) = lookup("FRONTEND_URL") {
        config.origins.frontend_url = Some(url);
    }
    if let Some(list) = lookup("ADDITIONAL_ALLOWED_ORIGINS") {
        config.origins.additional = list
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();
    }

    if let Some(secret) = lookup("SESSION_SECRET").filter(|s| !s.is_empty()) {
        config.session.secret = secret;
    }

    if let Some(dir) = lookup("PUBLIC_DIR") {
        config.static_files.public_dir = PathBuf::from(dir);
    }

    if let Some(url) = lookup("DATABASE_URL").filter(|s| !s.is_empty()) {
        config.database.url = Some(url);
    }
}

/// Unset, non-numeric and zero ports fall back to the default.
pub fn parse_port(raw: &str) -> u16 {
    raw.trim()
        .parse::<u16>()
        .ok()
        .filter(|port| *port != 0)
        .unwrap_or(DEFAULT_PORT)
}

fn absolute_dir(dir: &Path) -> Result<PathBuf, std::io::Error> {
    if dir.is_absolute() {
        Ok(dir.to_path_buf())
    } else {
        std::path::absolute(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn port_fallbacks() {
        assert_eq!(parse_port("3000"), 3000);
        assert_eq!(parse_port("abc"), DEFAULT_PORT);
        assert_eq!(parse_port("0"), DEFAULT_PORT);
        assert_eq!(parse_port(""), DEFAULT_PORT);
        assert_eq!(parse_port("70000"), DEFAULT_PORT);
    }

    #[test]
    fn environment_overlay() {
        let mut config = GatewayConfig::default();
        apply_env(
            &mut config,
            env(&[
                ("NODE_ENV", "production"),
                ("PORT", "9001"),
                ("CLIENT_URL", "https://app.example.com"),
                ("ADDITIONAL_ALLOWED_ORIGINS", "https://a.example.com, ,https://b.example.com"),
                ("SESSION_SECRET", "s3cret"),
            ]),
        );

        assert!(config.environment.is_production());
        assert_eq!(config.listener.port, 9001);
        assert_eq!(config.origins.client_url.as_deref(), Some("https://app.example.com"));
        assert_eq!(
            config.origins.additional,
            vec!["https://a.example.com", "https://b.example.com"]
        );
        assert_eq!(config.session.secret, "s3cret");
    }

    #[test]
    fn app_env_wins_over_node_env() {
        let mut config = GatewayConfig::default();
        apply_env(&mut config, env(&[("APP_ENV", "development"), ("NODE_ENV", "production")]));
        assert!(!config.environment.is_production());
    }

    #[test]
    fn empty_secret_keeps_fallback() {
        let mut config = GatewayConfig::default();
        apply_env(&mut config, env(&[("SESSION_SECRET", "")]));
        assert_eq!(config.session.secret, crate::config::schema::FALLBACK_SESSION_SECRET);
    }

    #[test]
    fn malformed_origin_fails_fast() {
        let mut config = GatewayConfig::default();
        apply_env(&mut config, env(&[("FRONTEND_URL", "streamscene")]));
        let err = finalize(config).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
    }

    #[test]
    fn public_dir_becomes_absolute() {
        let config = finalize(GatewayConfig::default()).unwrap();
        assert!(config.static_files.public_dir.is_absolute());
        assert!(config.static_files.public_dir.ends_with("public"));
    }

    #[test]
    fn toml_sections_are_optional() {
        let config: GatewayConfig = toml::from_str(
            r#"
            environment = "production"
            [listener]
            port = 8443
            "#,
        )
        .unwrap();
        assert!(config.environment.is_production());
        assert_eq!(config.listener.port, 8443);
        assert_eq!(config.listener.host, "0.0.0.0");
        assert_eq!(config.liveness_path, "/test-server");
    }
}
