use super::INSECURE_SECRET_KEY;
use serde::{Deserialize, Serialize};

/// HMAC algorithms accepted for access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum JwtAlgorithm {
    #[default]
    HS256,
    HS384,
    HS512,
}

impl From<JwtAlgorithm> for jsonwebtoken::Algorithm {
    fn from(value: JwtAlgorithm) -> Self {
        match value {
            JwtAlgorithm::HS256 => jsonwebtoken::Algorithm::HS256,
            JwtAlgorithm::HS384 => jsonwebtoken::Algorithm::HS384,
            JwtAlgorithm::HS512 => jsonwebtoken::Algorithm::HS512,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Shared secret for signing access tokens.
    /// TOML: `auth.secret_key`. Env: `APP_AUTH__SECRET_KEY`.
    #[serde(default)]
    pub secret_key: String,

    /// TOML: `auth.algorithm`. Default: `HS256`.
    #[serde(default)]
    pub algorithm: JwtAlgorithm,

    /// TOML: `auth.access_token_expire_minutes`. Default: `30`.
    #[serde(default = "default_expire_minutes")]
    pub access_token_expire_minutes: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: INSECURE_SECRET_KEY.to_string(),
            algorithm: JwtAlgorithm::default(),
            access_token_expire_minutes: default_expire_minutes(),
        }
    }
}

fn default_expire_minutes() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Lifetime of a pending OAuth login (state + nonce), in seconds.
    /// TOML: `session.oauth_ttl_secs`. Default: `900`.
    #[serde(default = "default_oauth_ttl")]
    pub oauth_ttl_secs: u64,

    /// Lifetime of a login session, in seconds.
    /// TOML: `session.login_ttl_secs`. Default: `86400`.
    #[serde(default = "default_login_ttl")]
    pub login_ttl_secs: u64,

    /// Upper bound on cached session entries.
    /// TOML: `session.max_capacity`. Default: `100000`.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            oauth_ttl_secs: default_oauth_ttl(),
            login_ttl_secs: default_login_ttl(),
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_oauth_ttl() -> u64 {
    15 * 60
}

fn default_login_ttl() -> u64 {
    24 * 60 * 60
}

fn default_max_capacity() -> u64 {
    100_000
}
