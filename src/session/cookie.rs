//! Session cookie signing and attributes.
//!
//! Cookie value format: `<session-id>.<signature>` where the signature is
//! HMAC-SHA256 over the session id, base64url without padding.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use cookie::{Cookie, SameSite};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::Environment;
use crate::session::store::{SessionError, SessionId};

type HmacSha256 = Hmac<Sha256>;

/// Security attributes of issued session cookies, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieAttributes {
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
}

impl CookieAttributes {
    /// Production cookies must cross sites over HTTPS; elsewhere they stay lax.
    pub fn for_environment(environment: Environment) -> Self {
        if environment.is_production() {
            Self {
                secure: true,
                http_only: true,
                same_site: SameSite::None,
            }
        } else {
            Self {
                secure: false,
                http_only: true,
                same_site: SameSite::Lax,
            }
        }
    }
}

/// Signs and verifies session cookie values.
#[derive(Clone)]
pub struct CookieSigner {
    mac: HmacSha256,
}

impl std::fmt::Debug for CookieSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieSigner").finish_non_exhaustive()
    }
}

impl CookieSigner {
    /// Keys the MAC once; every signature clones it.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, SessionError> {
        let mac = HmacSha256::new_from_slice(secret.as_ref())
            .map_err(|e| SessionError::SigningKey(e.to_string()))?;
        Ok(Self { mac })
    }

    pub fn sign(&self, id: &SessionId) -> String {
        let mut mac = self.mac.clone();
        mac.update(id.as_str().as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{}.{}", id, signature)
    }

    /// Returns the session id when the signature is valid.
    pub fn verify(&self, value: &str) -> Option<SessionId> {
        let (id, signature) = value.rsplit_once('.')?;
        if id.is_empty() {
            return None;
        }
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

        let mut mac = self.mac.clone();
        mac.update(id.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(SessionId::from(id.to_string()))
    }
}

/// Builds session cookies with the startup-fixed attributes.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub name: String,
    pub attributes: CookieAttributes,
    pub signer: CookieSigner,
}

impl SessionCookie {
    /// Find and verify the session cookie among raw `Cookie` header values.
    pub fn read<'a>(&self, header_values: impl IntoIterator<Item = &'a str>) -> Option<SessionId> {
        header_values
            .into_iter()
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .filter(|c| c.name() == self.name)
            .find_map(|c| self.signer.verify(c.value()))
    }

    /// Cookie issuing `id` for `max_age_secs` seconds.
    pub fn issue(&self, id: &SessionId, max_age_secs: i64) -> Cookie<'static> {
        self.base(self.signer.sign(id))
            .max_age(cookie::time::Duration::seconds(max_age_secs))
            .build()
    }

    /// Cookie instructing the client to drop the session.
    pub fn clear(&self) -> Cookie<'static> {
        self.base(String::new())
            .max_age(cookie::time::Duration::ZERO)
            .build()
    }

    fn base(&self, value: String) -> cookie::CookieBuilder<'static> {
        Cookie::build((self.name.clone(), value))
            .path("/")
            .http_only(self.attributes.http_only)
            .secure(self.attributes.secure)
            .same_site(self.attributes.same_site)
    }
}
