//! Identity resolution for authenticated sessions.

use std::fmt;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{request::Parts, StatusCode},
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::response::ErrorBody;

/// The caller a session is authenticated as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            email: None,
        }
    }
}

#[derive(Debug, Error)]
#[error("identity lookup failed: {0}")]
pub struct IdentityError(pub String);

/// Turns a session's identity reference back into an identity.
///
/// `Ok(None)` means the identity no longer exists.
#[async_trait]
pub trait IdentityResolver: Send + Sync + fmt::Debug {
    async fn resolve(&self, identity_ref: &str) -> Result<Option<Identity>, IdentityError>;
}

/// In-memory identity directory.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    identities: DashMap<String, Identity>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, identity: Identity) {
        self.identities.insert(identity.id.clone(), identity);
    }

    pub fn remove(&self, id: &str) -> Option<Identity> {
        self.identities.remove(id).map(|(_, identity)| identity)
    }
}

#[async_trait]
impl IdentityResolver for MemoryDirectory {
    async fn resolve(&self, identity_ref: &str) -> Result<Option<Identity>, IdentityError> {
        Ok(self.identities.get(identity_ref).map(|entry| entry.value().clone()))
    }
}

/// The authenticated identity of the current request.
///
/// As an extractor it rejects anonymous callers with `401`; use
/// `Option<CurrentUser>` where anonymous access is fine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub Identity);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, axum::Json<ErrorBody>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ErrorBody::response(StatusCode::UNAUTHORIZED, "Not authenticated"))
    }
}

impl<S> OptionalFromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser>().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn directory_resolves_known_identities() {
        let directory = MemoryDirectory::new();
        directory.insert(Identity::new("user-1"));

        assert_eq!(
            directory.resolve("user-1").await.unwrap(),
            Some(Identity::new("user-1"))
        );
        assert!(directory.resolve("user-2").await.unwrap().is_none());

        directory.remove("user-1");
        assert!(directory.resolve("user-1").await.unwrap().is_none());
    }

    #[test]
    fn identity_serializes_without_empty_fields() {
        let json = serde_json::to_value(Identity::new("u")).unwrap();
        assert_eq!(json, serde_json::json!({ "id": "u" }));
    }
}
