use crate::auth::Claims;
use crate::db::schema::ADMIN_ROLE;
use crate::error::ApiError;
use crate::server::router::AppState;
use crate::session::{LoginSession, SESSION_COOKIE};
use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use std::marker::PhantomData;
use tracing::debug;

/// Caller authenticated with a valid bearer access token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.0.uid
    }

    pub fn is_admin(&self) -> bool {
        self.0.has_role(ADMIN_ROLE)
    }

    /// Allow access to resources owned by `owner_id`, or to anything for admins.
    pub fn ensure_owner_or_admin(&self, owner_id: i64) -> Result<(), ApiError> {
        if self.id() == owner_id || self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Permission denied"))
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .typed_get::<Authorization<Bearer>>()
            .ok_or(AuthError::MissingToken)?;

        match state.jwt.decode(bearer.token()) {
            Ok(claims) => Ok(AuthUser(claims)),
            Err(e) => {
                debug!(error = %e, "access token rejected");
                Err(AuthError::InvalidToken)
            }
        }
    }
}

/// A role an endpoint can demand through [`RequireRole`].
pub trait RequiredRole: Send + Sync + 'static {
    const NAME: &'static str;
    const DENIED: &'static str = "Permission denied";
}

#[derive(Debug, Clone, Copy)]
pub struct Admin;

impl RequiredRole for Admin {
    const NAME: &'static str = ADMIN_ROLE;
    const DENIED: &'static str = "Admin access required";
}

/// Bearer-authenticated caller holding role `R`.
#[derive(Debug, Clone)]
pub struct RequireRole<R: RequiredRole> {
    pub user: AuthUser,
    _role: PhantomData<R>,
}

impl<R: RequiredRole> FromRequestParts<AppState> for RequireRole<R> {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.0.has_role(R::NAME) {
            Ok(RequireRole {
                user,
                _role: PhantomData,
            })
        } else {
            Err(AuthError::PermissionDenied(R::DENIED))
        }
    }
}

/// Caller holding a login session cookie established by an OAuth login.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub session_id: String,
    pub session: LoginSession,
}

impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::from_headers(&parts.headers, state.cookie_key.clone());
        let session_id = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or(AuthError::MissingSession)?;

        let session = state
            .sessions
            .get_login(&session_id)
            .await
            .ok_or(AuthError::MissingSession)?;

        Ok(SessionUser {
            session_id,
            session,
        })
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    MissingSession,
    PermissionDenied(&'static str),
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingToken => ApiError::unauthorized("Not authenticated"),
            AuthError::InvalidToken => ApiError::forbidden("Invalid token"),
            AuthError::MissingSession => ApiError::unauthorized("No active session"),
            AuthError::PermissionDenied(reason) => ApiError::forbidden(reason),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
