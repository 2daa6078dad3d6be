//! Startup orchestration.
//!
//! # Responsibilities
//! - Wait for the persistence layer before accepting traffic
//! - Bind the listener and serve the assembled gateway
//!
//! # Design Decisions
//! - Fail fast: a persistence failure aborts before any bind
//! - Readiness is a TCP reachability check of the configured database; the
//!   gateway itself never speaks the database protocol

use std::fmt;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use url::Url;

use crate::config::DatabaseConfig;
use crate::http::server::{Gateway, GatewayError};
use crate::lifecycle::shutdown::Shutdown;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid database url: {0}")]
    DatabaseUrl(String),

    #[error("database at {target} not ready: {reason}")]
    Database { target: String, reason: String },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("server error: {0}")]
    Serve(#[from] io::Error),
}

/// The persistence layer the gateway depends on.
#[async_trait]
pub trait Persistence: Send + Sync + fmt::Debug {
    /// Resolves once the persistence layer can serve requests.
    async fn ready(&self) -> Result<(), StartupError>;
}

/// For deployments without a database.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPersistence;

#[async_trait]
impl Persistence for NoPersistence {
    async fn ready(&self) -> Result<(), StartupError> {
        Ok(())
    }
}

/// Checks the database host and port with a single TCP connect.
#[derive(Debug, Clone)]
pub struct TcpReadiness {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpReadiness {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    /// Host and port of a connection URL; credentials are never retained.
    pub fn from_url(raw: &str, timeout: Duration) -> Result<Self, StartupError> {
        let url = Url::parse(raw).map_err(|e| StartupError::DatabaseUrl(e.to_string()))?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| StartupError::DatabaseUrl(format!("no host in `{}` url", url.scheme())))?;
        let port = url
            .port()
            .or_else(|| default_port(url.scheme()))
            .ok_or_else(|| {
                StartupError::DatabaseUrl(format!("no port and no default for scheme `{}`", url.scheme()))
            })?;
        Ok(Self::new(host.trim_matches(['[', ']']), port, timeout))
    }

    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "postgres" | "postgresql" => Some(5432),
        "mysql" | "mariadb" => Some(3306),
        "redis" | "rediss" => Some(6379),
        "mongodb" => Some(27017),
        _ => None,
    }
}

#[async_trait]
impl Persistence for TcpReadiness {
    async fn ready(&self) -> Result<(), StartupError> {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(StartupError::Database {
                target: self.target(),
                reason: e.to_string(),
            }),
            Err(_) => Err(StartupError::Database {
                target: self.target(),
                reason: format!("no connection within {:?}", self.timeout),
            }),
        }
    }
}

/// `TcpReadiness` for a configured database URL, `NoPersistence` otherwise.
pub fn persistence_from_config(config: &DatabaseConfig) -> Result<Box<dyn Persistence>, StartupError> {
    match config.url.as_deref() {
        Some(url) => Ok(Box::new(TcpReadiness::from_url(
            url,
            Duration::from_secs(config.connect_timeout_secs),
        )?)),
        None => Ok(Box::new(NoPersistence)),
    }
}

/// Wait for persistence, bind, then serve until shutdown.
pub async fn launch(
    gateway: Gateway,
    persistence: &dyn Persistence,
    shutdown: &Shutdown,
) -> Result<(), StartupError> {
    persistence.ready().await?;
    tracing::info!("Persistence ready");

    let address = gateway.config().listener.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;

    gateway.serve(listener, shutdown.subscribe()).await?;
    Ok(())
}
