pub mod auth;
pub mod items;
pub mod oauth;
pub mod session;
pub mod system;
pub mod users;

use crate::error::ApiError;

/// Trim and lowercase an email, rejecting obviously malformed ones.
pub(crate) fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_ascii_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ApiError::BadRequest("A valid email is required".to_string())),
    }
}

pub(crate) fn require_non_empty(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(())
}
