use super::client::{OauthTokenResponse, build_oauth2_client};
use super::id_token::{IdTokenExpectations, validate_id_token};
use super::userinfo::{extract_email, fetch_github_primary_email, fetch_userinfo};
use crate::config::{OauthConfig, OauthProviderConfig};
use crate::error::OauthError;
use crate::session::OauthSession;
use chrono::Utc;
use oauth2::{
    AuthorizationCode, CsrfToken, PkceCodeChallenge, PkceCodeVerifier, Scope, TokenResponse,
};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;
use thiserror::Error as ThisError;
use tracing::{info, warn};

/// Supported login providers, addressed by the `{provider}` path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Google,
    Github,
    Facebook,
}

#[derive(Debug, ThisError)]
#[error("unknown OAuth provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Provider::Google),
            "github" => Ok(Provider::Github),
            "facebook" => Ok(Provider::Facebook),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the login endpoint needs: where to send the browser, and what to remember.
#[derive(Debug)]
pub struct AuthorizationRequest {
    pub url: url::Url,
    pub session: OauthSession,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Github => "github",
            Provider::Facebook => "facebook",
        }
    }

    pub fn config(self, oauth: &OauthConfig) -> &OauthProviderConfig {
        match self {
            Provider::Google => &oauth.google,
            Provider::Github => &oauth.github,
            Provider::Facebook => &oauth.facebook,
        }
    }

    /// Build the authorize URL with fresh `state`, `nonce` and PKCE challenge.
    ///
    /// The nonce is only sent to OpenID Connect providers but is always recorded.
    pub fn authorization_request(self, cfg: &OauthProviderConfig) -> AuthorizationRequest {
        let client = build_oauth2_client(cfg);
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        let nonce = CsrfToken::new_random();

        let mut req = client
            .authorize_url(CsrfToken::new_random)
            .set_pkce_challenge(challenge);
        for scope in &cfg.scopes {
            req = req.add_scope(Scope::new(scope.clone()));
        }
        if cfg.is_openid() {
            req = req.add_extra_param("nonce", nonce.secret().clone());
        }
        let (url, state) = req.url();

        AuthorizationRequest {
            url,
            session: OauthSession {
                provider: self.as_str().to_string(),
                state: state.secret().clone(),
                nonce: nonce.secret().clone(),
                pkce_verifier: verifier.secret().clone(),
                created_at: Utc::now(),
            },
        }
    }

    /// Check the callback against the stored session, exchange the code and
    /// resolve the user's identity claims.
    ///
    /// Returns the claims and the normalized email they carry.
    pub async fn complete_login(
        self,
        cfg: &OauthProviderConfig,
        http: &reqwest::Client,
        session: OauthSession,
        code: &str,
        state: &str,
    ) -> Result<(Value, String), OauthError> {
        if session.provider != self.as_str() {
            return Err(OauthError::flow(
                "OAUTH_PROVIDER_MISMATCH",
                "OAuth session was started for a different provider",
            ));
        }

        if !bool::from(state.as_bytes().ct_eq(session.state.as_bytes())) {
            return Err(OauthError::flow("CSRF_MISMATCH", "CSRF token mismatch"));
        }

        let token = self
            .exchange_code(cfg, http, code, session.pkce_verifier)
            .await?;

        let claims = if cfg.is_openid() {
            let id_token = token
                .extra_fields()
                .id_token
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    OauthError::flow("MISSING_ID_TOKEN", "Missing id_token in token response")
                })?;

            validate_id_token(
                id_token,
                &IdTokenExpectations {
                    nonce: &session.nonce,
                    client_id: &cfg.client_id,
                    issuers: &cfg.issuers,
                    now: Utc::now().timestamp(),
                },
            )?
        } else {
            self.userinfo(cfg, http, token.access_token().secret())
                .await?
        };

        let email = extract_email(&claims).ok_or_else(|| {
            OauthError::flow("MISSING_EMAIL", "Provider did not return a verified email")
        })?;

        info!(provider = %self, "OAuth login completed");
        Ok((claims, email))
    }

    async fn exchange_code(
        self,
        cfg: &OauthProviderConfig,
        http: &reqwest::Client,
        code: &str,
        pkce_verifier: String,
    ) -> Result<OauthTokenResponse, OauthError> {
        build_oauth2_client(cfg)
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
            .request_async(http)
            .await
            .map_err(|e| {
                // The provider's reply stays in the log; clients get a fixed message.
                warn!(provider = %self, error = ?e, "authorization code exchange failed");
                OauthError::flow("TOKEN_EXCHANGE_FAILED", "Authorization code exchange failed")
            })
    }

    async fn userinfo(
        self,
        cfg: &OauthProviderConfig,
        http: &reqwest::Client,
        access_token: &str,
    ) -> Result<Value, OauthError> {
        let mut claims = fetch_userinfo(http, &cfg.userinfo_url, access_token).await?;

        if self == Provider::Github && extract_email(&claims).is_none() {
            if let Some(email) =
                fetch_github_primary_email(http, &cfg.userinfo_url, access_token).await?
            {
                if let Some(obj) = claims.as_object_mut() {
                    obj.insert("email".to_string(), Value::String(email));
                }
            }
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn query(url: &url::Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn parses_known_providers_only() {
        assert_eq!("google".parse::<Provider>().ok(), Some(Provider::Google));
        assert_eq!("github".parse::<Provider>().ok(), Some(Provider::Github));
        assert_eq!("facebook".parse::<Provider>().ok(), Some(Provider::Facebook));
        assert!("twitter".parse::<Provider>().is_err());
        assert!("Google".parse::<Provider>().is_err());
    }

    #[test]
    fn openid_authorize_url_carries_state_nonce_and_pkce() {
        let oauth = OauthConfig::default();
        let mut cfg = Provider::Google.config(&oauth).clone();
        cfg.client_id = "client-123".into();

        let req = Provider::Google.authorization_request(&cfg);
        let q = query(&req.url);

        assert_eq!(q.get("client_id").map(String::as_str), Some("client-123"));
        assert_eq!(q.get("response_type").map(String::as_str), Some("code"));
        assert_eq!(q.get("state"), Some(&req.session.state));
        assert_eq!(q.get("nonce"), Some(&req.session.nonce));
        assert_eq!(q.get("code_challenge_method").map(String::as_str), Some("S256"));
        assert!(q.contains_key("code_challenge"));
        assert_eq!(q.get("scope").map(String::as_str), Some("openid email profile"));
        assert_eq!(req.session.provider, "google");
        assert_ne!(req.session.state, req.session.nonce);
    }

    #[test]
    fn plain_oauth_authorize_url_has_no_nonce() {
        let oauth = OauthConfig::default();
        let mut cfg = Provider::Github.config(&oauth).clone();
        cfg.client_id = "gh-client".into();

        let req = Provider::Github.authorization_request(&cfg);
        let q = query(&req.url);

        assert!(q.contains_key("state"));
        assert!(!q.contains_key("nonce"));
        assert!(!req.session.nonce.is_empty());
        assert_eq!(req.url.host_str(), Some("github.com"));
    }

    #[tokio::test]
    async fn callback_checks_provider_then_state() {
        let oauth = OauthConfig::default();
        let cfg = Provider::Github.config(&oauth).clone();
        let http = reqwest::Client::new();
        let session = Provider::Github.authorization_request(&cfg).session;

        let err = Provider::Google
            .complete_login(&cfg, &http, session.clone(), "code", &session.state)
            .await
            .unwrap_err();
        assert_eq!(err.flow_code(), Some("OAUTH_PROVIDER_MISMATCH"));

        let err = Provider::Github
            .complete_login(&cfg, &http, session, "code", "forged")
            .await
            .unwrap_err();
        assert_eq!(err.flow_code(), Some("CSRF_MISMATCH"));
    }
}
