//! Ephemeral session records (pending OAuth logins and login sessions).
//!
//! Records are addressed by an opaque id carried in the private `session_id`
//! cookie and stored under `session:{id}` in a [`SessionStore`].

mod store;

pub use store::{MokaSessionStore, SessionStore};

use base64::Engine as _;
use chrono::{DateTime, Utc};
use keystone_schema::SessionInfo;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Cookie that carries the session id.
pub const SESSION_COOKIE: &str = "session_id";

/// A pending authorization-code login, consumed by the callback.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OauthSession {
    pub provider: String,
    pub state: String,
    pub nonce: String,
    pub pkce_verifier: String,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for OauthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OauthSession")
            .field("provider", &self.provider)
            .field("state", &"<redacted>")
            .field("nonce", &"<redacted>")
            .field("pkce_verifier", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// An authenticated browser session established by an OAuth login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSession {
    pub user_id: i64,
    pub email: String,
    pub roles: Vec<String>,
    pub provider: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<LoginSession> for SessionInfo {
    fn from(s: LoginSession) -> Self {
        SessionInfo {
            user_id: s.user_id,
            email: s.email,
            roles: s.roles,
            provider: s.provider,
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionRecord {
    Oauth(OauthSession),
    Login(LoginSession),
}

/// Fresh 256-bit session id, base64url without padding.
pub fn new_session_id() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

pub(crate) fn session_key(id: &str) -> String {
    format!("session:{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique_and_url_safe() {
        let a = new_session_id();
        let b = new_session_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn debug_output_hides_secrets() {
        let s = OauthSession {
            provider: "google".into(),
            state: "state-value".into(),
            nonce: "nonce-value".into(),
            pkce_verifier: "verifier-value".into(),
            created_at: Utc::now(),
        };
        let out = format!("{s:?}");
        assert!(out.contains("google"));
        assert!(!out.contains("state-value"));
        assert!(!out.contains("verifier-value"));
    }
}
