use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use serde_json::Value;

/// Body of `POST /api/v1/login`. `username` carries the account email.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// Result of a completed OAuth callback.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct OauthLoginResponse {
    pub provider: String,
    /// Identity claims as reported by the provider (ID token or userinfo).
    #[schema(value_type = Object)]
    pub claims: Value,
    pub access_token: String,
    pub token_type: String,
}

/// Login session bound to the `session_id` cookie.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct SessionInfo {
    pub user_id: i64,
    pub email: String,
    pub roles: Vec<String>,
    pub provider: Option<String>,
    pub created_at: DateTime<Utc>,
}
