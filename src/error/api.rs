use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use sqlx::error::ErrorKind;
use std::time::Duration;
use thiserror::Error as ThisError;
use tracing::error;
use utoipa::ToSchema;

use super::oauth::OauthError;

#[derive(Debug, ThisError)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or unusable credentials (401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Credentials present but not good enough (403).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// OAuth login for an email already registered with a password.
    #[error("Account already exists")]
    AccountExists,

    #[error("Rate limit exceeded")]
    RateLimited { retry_after: Duration },

    #[error(transparent)]
    Oauth(#[from] OauthError),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Token error: {0}")]
    TokenError(#[from] jsonwebtoken::errors::Error),

    #[error("Password hash error: {0}")]
    PasswordHash(String),

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Oauth(OauthError::Flow { .. }) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::AccountExists => StatusCode::CONFLICT,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::DatabaseError(e) => database_status(e),
            ApiError::ReqwestError(_)
            | ApiError::Oauth(OauthError::Request(_) | OauthError::UpstreamStatus(_)) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Oauth(OauthError::ProviderUrl(_))
            | ApiError::JsonError(_)
            | ApiError::UrlError(_)
            | ApiError::TokenError(_)
            | ApiError::PasswordHash(_)
            | ApiError::RactorError(_)
            | ApiError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn database_status(err: &sqlx::Error) -> StatusCode {
    match err {
        sqlx::Error::RowNotFound => StatusCode::NOT_FOUND,
        sqlx::Error::Database(db) => match db.kind() {
            ErrorKind::UniqueViolation | ErrorKind::ForeignKeyViolation => StatusCode::CONFLICT,
            ErrorKind::NotNullViolation | ErrorKind::CheckViolation => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let ApiError::RateLimited { retry_after } = &self {
            let mut resp = (status, Json(json!({ "message": "Rate limit exceeded" }))).into_response();
            let secs = retry_after.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                resp.headers_mut().insert(RETRY_AFTER, value);
            }
            return resp;
        }

        // Details of 5xx failures stay in the log; clients get a generic body.
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        }

        let body = match self {
            ApiError::Oauth(OauthError::Flow {
                code,
                message,
                details,
            }) => ApiErrorObject {
                code,
                message,
                details,
            },

            ApiError::BadRequest(message) => ApiErrorObject::new("BAD_REQUEST", message),
            ApiError::Unauthorized(message) => ApiErrorObject::new("UNAUTHORIZED", message),
            ApiError::Forbidden(message) => ApiErrorObject::new("FORBIDDEN", message),
            ApiError::NotFound(message) => ApiErrorObject::new("NOT_FOUND", message),
            ApiError::Conflict(message) => ApiErrorObject::new("CONFLICT", message),
            ApiError::AccountExists => ApiErrorObject::new(
                "ACCOUNT_EXISTS",
                "An account with this email already exists. Sign in with its password.",
            ),

            ApiError::DatabaseError(e) => match status {
                StatusCode::NOT_FOUND => ApiErrorObject::new("NOT_FOUND", "Resource not found."),
                StatusCode::CONFLICT => ApiErrorObject::new("CONFLICT", constraint_message(&e)),
                StatusCode::BAD_REQUEST => {
                    ApiErrorObject::new("CONSTRAINT_VIOLATION", constraint_message(&e))
                }
                _ => ApiErrorObject::new("INTERNAL_ERROR", "Internal Server Error"),
            },

            ApiError::ReqwestError(_) | ApiError::Oauth(_) if status == StatusCode::BAD_GATEWAY => {
                ApiErrorObject::new("UPSTREAM_ERROR", "Upstream service error.")
            }

            _ => ApiErrorObject::new("INTERNAL_ERROR", "Internal Server Error"),
        };

        (status, Json(ApiErrorBody { inner: body })).into_response()
    }
}

fn constraint_message(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db) => match db.kind() {
            ErrorKind::UniqueViolation => "A record with the same unique value already exists.",
            ErrorKind::ForeignKeyViolation => "A referenced record does not exist.",
            ErrorKind::NotNullViolation => "A required field is missing.",
            _ => "Constraint violation.",
        },
        _ => "Constraint violation.",
    }
    .to_string()
}

/// Standardized API error response payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
}

impl ApiErrorObject {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorBody {
    #[serde(rename = "error")]
    pub inner: ApiErrorObject,
}
