//! Request-scoped session handle.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use parking_lot::Mutex;

use crate::http::response::ErrorBody;
use crate::session::store::{SessionId, SessionRecord};

/// What the request did to its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    Unchanged,
    Modified,
    Destroyed,
}

#[derive(Debug)]
struct Inner {
    record: SessionRecord,
    change: SessionChange,
    is_new: bool,
    /// Persisted id superseded on log-in.
    replaced: Option<SessionId>,
}

/// Handle to the current request's session, shared between the session
/// middleware and handlers through request extensions.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<Mutex<Inner>>,
}

impl Session {
    pub(crate) fn existing(record: SessionRecord) -> Self {
        Self::wrap(record, false)
    }

    pub(crate) fn fresh(record: SessionRecord) -> Self {
        Self::wrap(record, true)
    }

    fn wrap(record: SessionRecord, is_new: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                record,
                change: SessionChange::Unchanged,
                is_new,
                replaced: None,
            })),
        }
    }

    pub fn id(&self) -> SessionId {
        self.inner.lock().record.id.clone()
    }

    /// True until the session has been persisted once.
    pub fn is_new(&self) -> bool {
        self.inner.lock().is_new
    }

    pub fn identity(&self) -> Option<String> {
        self.inner.lock().record.identity.clone()
    }

    pub fn record(&self) -> SessionRecord {
        self.inner.lock().record.clone()
    }

    pub fn change(&self) -> SessionChange {
        self.inner.lock().change
    }

    /// The stored id this session was moved away from by [`Session::log_in`].
    pub fn replaced(&self) -> Option<SessionId> {
        self.inner.lock().replaced.clone()
    }

    /// Bind the session to an identity reference.
    ///
    /// A session that was already persisted moves to a fresh id, so an id
    /// known before log-in never carries the identity.
    pub fn log_in(&self, identity_ref: impl Into<String>) {
        let mut inner = self.inner.lock();
        inner.record.identity = Some(identity_ref.into());
        if inner.change == SessionChange::Destroyed {
            return;
        }
        inner.change = SessionChange::Modified;
        if !inner.is_new && inner.replaced.is_none() {
            let previous = std::mem::replace(&mut inner.record.id, SessionId::generate());
            inner.replaced = Some(previous);
        }
    }

    /// Drop the identity but keep the session.
    pub fn log_out(&self) {
        let mut inner = self.inner.lock();
        if inner.record.identity.take().is_some() && inner.change != SessionChange::Destroyed {
            inner.change = SessionChange::Modified;
        }
    }

    /// Remove the session from the store and clear the client cookie.
    pub fn destroy(&self) {
        let mut inner = self.inner.lock();
        inner.record.identity = None;
        inner.change = SessionChange::Destroyed;
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, axum::Json<ErrorBody>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or_else(|| {
            tracing::error!("Session extractor used without the session middleware");
            ErrorBody::response(StatusCode::INTERNAL_SERVER_ERROR, "Session unavailable")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session() -> Session {
        Session::fresh(SessionRecord::new(Duration::hours(24)))
    }

    #[test]
    fn log_in_marks_modified() {
        let s = session();
        assert_eq!(s.change(), SessionChange::Unchanged);
        s.log_in("user-1");
        assert_eq!(s.identity().as_deref(), Some("user-1"));
        assert_eq!(s.change(), SessionChange::Modified);
    }

    #[test]
    fn log_in_moves_a_stored_session_to_a_new_id() {
        let s = Session::existing(SessionRecord::new(Duration::hours(24)));
        let before = s.id();
        s.log_in("user-1");
        assert_ne!(s.id(), before);
        assert_eq!(s.replaced(), Some(before.clone()));

        let rotated = s.id();
        s.log_in("user-2");
        assert_eq!(s.id(), rotated);
        assert_eq!(s.replaced(), Some(before));
    }

    #[test]
    fn fresh_session_keeps_its_id_on_log_in() {
        let s = session();
        let before = s.id();
        s.log_in("user-1");
        assert_eq!(s.id(), before);
        assert!(s.replaced().is_none());
    }

    #[test]
    fn log_out_without_identity_is_unchanged() {
        let s = session();
        s.log_out();
        assert_eq!(s.change(), SessionChange::Unchanged);
    }

    #[test]
    fn destroy_is_final() {
        let s = session();
        s.destroy();
        s.log_in("user-1");
        assert_eq!(s.change(), SessionChange::Destroyed);
    }

    #[test]
    fn clones_share_state() {
        let s = session();
        let other = s.clone();
        other.log_in("user-2");
        assert_eq!(s.identity().as_deref(), Some("user-2"));
    }
}
