//! Session bootstrap and identity middleware.
//!
//! # Responsibilities
//! - Read and verify the session cookie
//! - Load the session record, or start a fresh one
//! - Resolve the bound identity and attach `CurrentUser`
//! - Persist changes and issue or clear the cookie after the handler ran
//!
//! # Design Decisions
//! - Never rejects a request; handlers decide whether authentication is required
//! - Store and resolver failures degrade to an unauthenticated request
//! - New sessions are only persisted once modified
//! - Secure cookies are withheld on insecure connections

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use chrono::Duration;

use crate::config::{Environment, SessionConfig};
use crate::http::request::{Protocol, RequestContext};
use crate::observability::metrics;
use crate::session::cookie::{CookieAttributes, CookieSigner, SessionCookie};
use crate::session::handle::{Session, SessionChange};
use crate::session::identity::{CurrentUser, Identity, IdentityResolver};
use crate::session::store::{SessionError, SessionRecord, SessionStore};

/// Owns the session store, identity resolver and cookie policy.
#[derive(Debug)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    identities: Arc<dyn IdentityResolver>,
    cookie: SessionCookie,
    ttl: Duration,
}

/// A loaded session plus whether the client presented a valid cookie for it.
#[derive(Debug)]
pub struct LoadedSession {
    pub session: Session,
    pub cookie_presented: bool,
}

impl SessionManager {
    pub fn new(
        config: &SessionConfig,
        environment: Environment,
        store: Arc<dyn SessionStore>,
        identities: Arc<dyn IdentityResolver>,
    ) -> Result<Self, SessionError> {
        let ttl_hours = i64::try_from(config.ttl_hours).unwrap_or(i64::MAX);
        Ok(Self {
            store,
            identities,
            cookie: SessionCookie {
                name: config.cookie_name.clone(),
                attributes: CookieAttributes::for_environment(environment),
                signer: CookieSigner::new(&config.secret)?,
            },
            ttl: Duration::try_hours(ttl_hours).unwrap_or(Duration::MAX),
        })
    }

    pub fn cookie_attributes(&self) -> CookieAttributes {
        self.cookie.attributes
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie.name
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Load the session named by the request's cookie, or start a new one.
    pub async fn load(&self, headers: &HeaderMap) -> LoadedSession {
        let id = self.cookie.read(
            headers
                .get_all(header::COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        );

        let Some(id) = id else {
            return LoadedSession {
                session: Session::fresh(SessionRecord::new(self.ttl)),
                cookie_presented: false,
            };
        };

        match self.store.load(&id).await {
            Ok(Some(record)) => LoadedSession {
                session: Session::existing(record),
                cookie_presented: true,
            },
            Ok(None) => {
                tracing::debug!(session_id = %id, "Session cookie refers to an unknown or expired session");
                LoadedSession {
                    session: Session::fresh(SessionRecord::new(self.ttl)),
                    cookie_presented: true,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session store load failed; continuing unauthenticated");
                LoadedSession {
                    session: Session::fresh(SessionRecord::new(self.ttl)),
                    cookie_presented: true,
                }
            }
        }
    }

    /// Resolve the session's identity reference.
    ///
    /// A reference to a vanished identity is dropped from the session.
    pub async fn authenticate(&self, session: &Session) -> Option<Identity> {
        let identity_ref = session.identity()?;
        match self.identities.resolve(&identity_ref).await {
            Ok(Some(identity)) => Some(identity),
            Ok(None) => {
                tracing::debug!(identity = %identity_ref, "Session identity no longer exists");
                session.log_out();
                None
            }
            Err(e) => {
                tracing::warn!(identity = %identity_ref, error = %e, "Identity resolution failed");
                None
            }
        }
    }

    /// Persist what the request did to its session and set cookies accordingly.
    pub async fn commit(
        &self,
        loaded: &LoadedSession,
        protocol: Protocol,
        response_headers: &mut HeaderMap,
    ) {
        let session = &loaded.session;
        match session.change() {
            SessionChange::Unchanged => {}
            SessionChange::Destroyed => {
                if !session.is_new() {
                    let stored = session.replaced().unwrap_or_else(|| session.id());
                    if let Err(e) = self.store.destroy(&stored).await {
                        tracing::error!(error = %e, "Failed to destroy session");
                    }
                }
                if loaded.cookie_presented {
                    append_cookie(response_headers, &self.cookie.clear().to_string());
                }
            }
            SessionChange::Modified => {
                let replaced = session.replaced();
                let issue_cookie = session.is_new() || replaced.is_some();
                if issue_cookie && self.cookie.attributes.secure && !protocol.is_secure() {
                    tracing::debug!("Not issuing secure session cookie over an insecure connection");
                    return;
                }

                let record = session.record();
                if let Err(e) = self.store.save(&record).await {
                    tracing::error!(error = %e, "Failed to save session");
                    return;
                }
                if let Some(previous) = replaced {
                    if let Err(e) = self.store.destroy(&previous).await {
                        tracing::error!(error = %e, "Failed to destroy replaced session");
                    }
                }

                if issue_cookie {
                    if session.is_new() {
                        metrics::record_session_created();
                    }
                    let max_age = record.remaining().num_seconds();
                    append_cookie(response_headers, &self.cookie.issue(&record.id, max_age).to_string());
                }
            }
        }
    }
}

fn append_cookie(headers: &mut HeaderMap, cookie: &str) {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            headers.append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::error!(error = %e, "Session cookie is not a valid header value"),
    }
}

/// Middleware establishing the session and identity of every request.
pub async fn session_middleware(
    State(manager): State<Arc<SessionManager>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let protocol = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.protocol)
        .unwrap_or_default();

    let loaded = manager.load(request.headers()).await;
    if let Some(identity) = manager.authenticate(&loaded.session).await {
        request.extensions_mut().insert(CurrentUser(identity));
    }
    request.extensions_mut().insert(loaded.session.clone());

    let mut response = next.run(request).await;
    manager.commit(&loaded, protocol, response.headers_mut()).await;
    response
}
