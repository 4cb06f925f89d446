pub mod auth;

pub use auth::{Admin, AuthError, AuthUser, RequireRole, RequiredRole, SessionUser};
