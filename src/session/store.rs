//! Session records and their backing store.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Opaque session identifier carried by the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-side session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    /// Fixed at creation; never extended by activity.
    pub expires_at: DateTime<Utc>,
    /// Reference to the authenticated identity, if any.
    pub identity: Option<String>,
}

impl SessionRecord {
    pub fn new(ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::generate(),
            created_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            identity: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self) -> Duration {
        (self.expires_at - Utc::now()).max(Duration::zero())
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid session signing key: {0}")]
    SigningKey(String),
}

/// Process-wide session storage keyed by session identifier.
///
/// Implementations must tolerate concurrent access to distinct sessions;
/// the gateway performs no locking of its own.
#[async_trait]
pub trait SessionStore: Send + Sync + fmt::Debug {
    /// Load a live session. Expired sessions are reported as absent.
    async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>, SessionError>;

    async fn save(&self, record: &SessionRecord) -> Result<(), SessionError>;

    async fn destroy(&self, id: &SessionId) -> Result<(), SessionError>;
}

/// In-memory session store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<SessionId, SessionRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every expired record. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_expired_at(now));
        before.saturating_sub(self.records.len())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>, SessionError> {
        let record = self.records.get(id).map(|entry| entry.value().clone());
        match record {
            Some(record) if record.is_expired() => {
                self.records.remove(id);
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), SessionError> {
        self.records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn destroy(&self, id: &SessionId) -> Result<(), SessionError> {
        self.records.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_load_destroy() {
        let store = MemoryStore::new();
        let record = SessionRecord::new(Duration::hours(24));

        store.save(&record).await.unwrap();
        assert_eq!(store.load(&record.id).await.unwrap(), Some(record.clone()));

        store.destroy(&record.id).await.unwrap();
        assert!(store.load(&record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_records_are_absent_and_evicted() {
        let store = MemoryStore::new();
        let mut record = SessionRecord::new(Duration::hours(24));
        record.expires_at = Utc::now() - Duration::seconds(1);

        store.save(&record).await.unwrap();
        assert!(store.load(&record.id).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn purge_keeps_live_sessions() {
        let store = MemoryStore::new();
        let live = SessionRecord::new(Duration::hours(1));
        let mut dead = SessionRecord::new(Duration::hours(1));
        dead.expires_at = Utc::now() - Duration::minutes(5);
        store.records.insert(live.id.clone(), live);
        store.records.insert(dead.id.clone(), dead);

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn expiry_is_fixed_from_creation() {
        let record = SessionRecord::new(Duration::hours(24));
        assert_eq!(record.expires_at - record.created_at, Duration::hours(24));
        assert!(record.remaining() <= Duration::hours(24));
        assert!(!record.is_expired());
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }
}
