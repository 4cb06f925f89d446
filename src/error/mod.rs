mod api;
mod oauth;

pub use api::{ApiError, ApiErrorBody, ApiErrorObject};
pub use oauth::OauthError;
