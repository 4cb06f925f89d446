use crate::error::{ApiError, ApiErrorBody, OauthError};
use crate::oauth::Provider;
use crate::server::router::AppState;
use crate::session::{LoginSession, SESSION_COOKIE, new_session_id};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use chrono::Utc;
use keystone_schema::OauthLoginResponse;
use serde::Deserialize;
use serde_json::json;
use time::Duration;
use tracing::{info, warn};
use utoipa::IntoParams;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/oauth/{provider}/login", get(oauth_login))
        .route("/oauth/{provider}/callback", get(oauth_callback))
}

/// Query string of the provider's redirect back to us.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

fn parse_provider(name: &str) -> Result<Provider, ApiError> {
    name.parse::<Provider>()
        .map_err(|e| ApiError::not_found(e.to_string()))
}

/// GET /api/v1/oauth/{provider}/login
///
/// Records a pending login under a fresh session id and redirects the browser
/// to the provider's consent page.
#[utoipa::path(
    get,
    path = "/api/v1/oauth/{provider}/login",
    params(("provider" = String, Path, description = "`google`, `github` or `facebook`")),
    responses(
        (status = 307, description = "Redirect to the provider; sets the `session_id` cookie"),
        (status = 404, description = "Unknown or unconfigured provider", body = ApiErrorBody),
    ),
    tag = "oauth"
)]
pub async fn oauth_login(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: PrivateCookieJar,
) -> Result<Response, ApiError> {
    let provider = parse_provider(&provider)?;
    let cfg = provider.config(&state.config.oauth);
    if !cfg.is_configured() {
        return Err(ApiError::not_found(format!(
            "OAuth provider is not configured: {provider}"
        )));
    }

    let request = provider.authorization_request(cfg);
    let session_id = new_session_id();
    state.sessions.put_oauth(&session_id, request.session).await;

    let ttl = Duration::seconds(i64::try_from(state.config.session.oauth_ttl_secs).unwrap_or(i64::MAX));
    let jar = jar.add(build_cookie(session_id, state.secure_cookies(), ttl));

    info!(provider = %provider, "Dispatching OAuth redirect");
    Ok((jar, Redirect::temporary(request.url.as_str())).into_response())
}

/// GET /api/v1/oauth/{provider}/callback
#[utoipa::path(
    get,
    path = "/api/v1/oauth/{provider}/callback",
    params(("provider" = String, Path, description = "`google`, `github` or `facebook`"), AuthCallbackQuery),
    responses(
        (status = 200, description = "Login completed; rotates the `session_id` cookie", body = OauthLoginResponse),
        (status = 400, description = "Flow error with a machine-readable code", body = ApiErrorBody),
        (status = 409, description = "Email belongs to a password account", body = ApiErrorBody),
        (status = 502, body = ApiErrorBody),
    ),
    tag = "oauth"
)]
pub async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<AuthCallbackQuery>,
    jar: PrivateCookieJar,
) -> Response {
    let session_id = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));

    match process_callback(&state, &provider, query, session_id).await {
        Ok((login_id, body)) => {
            let ttl = Duration::seconds(
                i64::try_from(state.config.session.login_ttl_secs).unwrap_or(i64::MAX),
            );
            let jar = jar.add(build_cookie(login_id, state.secure_cookies(), ttl));
            (jar, Json(body)).into_response()
        }
        Err(err) => {
            warn!("OAuth callback failure: {}", err);
            (jar, err).into_response()
        }
    }
}

async fn process_callback(
    state: &AppState,
    provider: &str,
    query: AuthCallbackQuery,
    session_id: Option<String>,
) -> Result<(String, OauthLoginResponse), ApiError> {
    let provider = parse_provider(provider)?;

    if let Some(error) = query.error {
        return Err(OauthError::Flow {
            code: "OAUTH_PROVIDER_ERROR".to_string(),
            message: format!("Provider returned an error: {error}"),
            details: Some(json!({
                "error": error,
                "error_description": query.error_description,
            })),
        }
        .into());
    }

    let (Some(code), Some(state_param)) = (query.code, query.state) else {
        return Err(OauthError::flow(
            "OAUTH_CALLBACK_MALFORMED",
            "Callback is missing `code` or `state`",
        )
        .into());
    };

    // Taking the record consumes it: a replayed callback finds nothing.
    let pending = match session_id {
        Some(id) => state.sessions.take_oauth(&id).await,
        None => None,
    }
    .ok_or_else(|| OauthError::flow("OAUTH_SESSION_MISSING", "Missing or expired OAuth session"))?;

    let cfg = provider.config(&state.config.oauth);
    let (claims, email) = provider
        .complete_login(cfg, &state.http, pending, &code, &state_param)
        .await?;

    let record = state.db.upsert_oauth_user(&email).await?;
    let access_token = state
        .jwt
        .issue(record.user.id, &record.user.email, &record.roles)?;

    // Rotate the id: the login session never reuses the pre-login one.
    let login_id = new_session_id();
    state
        .sessions
        .put_login(
            &login_id,
            LoginSession {
                user_id: record.user.id,
                email: record.user.email.clone(),
                roles: record.roles.clone(),
                provider: Some(provider.as_str().to_string()),
                created_at: Utc::now(),
            },
        )
        .await;

    info!(provider = %provider, user_id = record.user.id, "OAuth callback accepted");
    Ok((
        login_id,
        OauthLoginResponse {
            provider: provider.as_str().to_string(),
            claims,
            access_token,
            token_type: "bearer".to_string(),
        },
    ))
}

pub(crate) fn build_cookie(value: String, secure: bool, max_age: Duration) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}
