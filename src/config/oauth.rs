use serde::{Deserialize, Serialize};
use url::Url;

/// One OAuth2 / OpenID Connect login provider.
///
/// A provider whose scopes include `openid` is treated as OIDC: the callback
/// requires an `id_token` and validates its nonce, audience, issuer and expiry.
/// Other providers are identified through `userinfo_url`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OauthProviderConfig {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    pub authorize_url: Url,

    pub token_url: Url,

    pub userinfo_url: Url,

    /// Must match the redirect URL registered with the provider.
    pub redirect_url: Url,

    #[serde(default)]
    pub scopes: Vec<String>,

    /// Accepted `iss` values of the ID token (OIDC only).
    #[serde(default)]
    pub issuers: Vec<String>,
}

impl OauthProviderConfig {
    pub fn is_openid(&self) -> bool {
        self.scopes.iter().any(|s| s == "openid")
    }

    pub fn is_configured(&self) -> bool {
        !self.client_id.trim().is_empty()
    }
}

/// All login providers. Credentials come from config.toml or
/// `APP_OAUTH__<PROVIDER>__CLIENT_ID` / `APP_OAUTH__<PROVIDER>__CLIENT_SECRET`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OauthConfig {
    #[serde(default = "default_google")]
    pub google: OauthProviderConfig,

    #[serde(default = "default_github")]
    pub github: OauthProviderConfig,

    #[serde(default = "default_facebook")]
    pub facebook: OauthProviderConfig,
}

impl Default for OauthConfig {
    fn default() -> Self {
        Self {
            google: default_google(),
            github: default_github(),
            facebook: default_facebook(),
        }
    }
}

fn parse(url: &str) -> Url {
    Url::parse(url).expect("built-in OAuth URL must be valid")
}

fn callback(provider: &str) -> Url {
    parse(&format!(
        "http://localhost:8000/api/v1/oauth/{provider}/callback"
    ))
}

fn default_google() -> OauthProviderConfig {
    OauthProviderConfig {
        client_id: String::new(),
        client_secret: String::new(),
        authorize_url: parse("https://accounts.google.com/o/oauth2/v2/auth"),
        token_url: parse("https://oauth2.googleapis.com/token"),
        userinfo_url: parse("https://openidconnect.googleapis.com/v1/userinfo"),
        redirect_url: callback("google"),
        scopes: vec![
            "openid".to_string(),
            "email".to_string(),
            "profile".to_string(),
        ],
        issuers: vec![
            "https://accounts.google.com".to_string(),
            "accounts.google.com".to_string(),
        ],
    }
}

fn default_github() -> OauthProviderConfig {
    OauthProviderConfig {
        client_id: String::new(),
        client_secret: String::new(),
        authorize_url: parse("https://github.com/login/oauth/authorize"),
        token_url: parse("https://github.com/login/oauth/access_token"),
        userinfo_url: parse("https://api.github.com/user"),
        redirect_url: callback("github"),
        scopes: vec!["read:user".to_string(), "user:email".to_string()],
        issuers: Vec::new(),
    }
}

fn default_facebook() -> OauthProviderConfig {
    OauthProviderConfig {
        client_id: String::new(),
        client_secret: String::new(),
        authorize_url: parse("https://www.facebook.com/v19.0/dialog/oauth"),
        token_url: parse("https://graph.facebook.com/v19.0/oauth/access_token"),
        userinfo_url: parse("https://graph.facebook.com/me?fields=id,name,email"),
        redirect_url: callback("facebook"),
        scopes: vec!["email".to_string()],
        issuers: Vec::new(),
    }
}
