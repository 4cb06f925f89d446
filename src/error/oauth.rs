use axum::http::StatusCode;
use serde_json::Value;
use thiserror::Error as ThisError;
use url::Url;

/// Failures of a third-party login.
#[derive(Debug, ThisError)]
pub enum OauthError {
    /// The login was refused. Rendered as 400 with `code` as the machine-readable reason.
    #[error("OAuth flow error [{code}]: {message}")]
    Flow {
        code: String,
        message: String,
        details: Option<Value>,
    },

    /// Transport failure while talking to the provider.
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider answered with status {0}")]
    UpstreamStatus(StatusCode),

    /// A configured provider endpoint cannot be derived from.
    #[error("unusable provider URL: {0}")]
    ProviderUrl(Url),
}

impl OauthError {
    pub fn flow(code: &str, message: impl Into<String>) -> Self {
        OauthError::Flow {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    /// Machine-readable code of a flow error, if this is one.
    pub fn flow_code(&self) -> Option<&str> {
        match self {
            OauthError::Flow { code, .. } => Some(code),
            _ => None,
        }
    }
}
