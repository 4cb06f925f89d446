use crate::auth::JwtCodec;
use crate::config::Config;
use crate::db::DbActorHandle;
use crate::error::ApiError;
use crate::server::openapi::docs_router;
use crate::server::rate_limit::{ClientRateLimiter, rate_limit};
use crate::server::routes::{auth, items, oauth, session, system, users};
use crate::session::{MokaSessionStore, SessionStore};

use axum::{
    Router,
    extract::{FromRef, Request},
    http::{HeaderName, HeaderValue, Method, Version, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::Key;
use base64::Engine as _;
use rand::RngCore;
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

const MAX_REQUEST_ID_LEN: usize = 128;
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

fn generate_request_id() -> String {
    // 96 bits => 16 chars base64url (no padding).
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn format_http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/?",
    }
}

/// Shared per-request state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: DbActorHandle,
    pub sessions: Arc<dyn SessionStore>,
    pub jwt: JwtCodec,
    pub config: Arc<Config>,
    pub http: reqwest::Client,
    pub cookie_key: Key,
    pub rate_limiter: Option<ClientRateLimiter>,
}

impl AppState {
    /// Wire up state around an already spawned database actor.
    pub fn new(config: Config, db: DbActorHandle) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;

        let cookie_key = match config.basic.cookie_secret.as_deref() {
            Some(secret) => Key::try_from(secret.as_bytes()).map_err(|e| {
                ApiError::UnexpectedError(format!("invalid basic.cookie_secret: {e}"))
            })?,
            None => Key::generate(),
        };

        let rate_limiter = if config.rate_limit.enabled {
            let quota = config
                .rate_limit
                .quota()
                .map_err(|e| ApiError::UnexpectedError(format!("rate_limit.limit: {e}")))?;
            Some(ClientRateLimiter::new(quota))
        } else {
            None
        };

        Ok(Self {
            db,
            sessions: Arc::new(MokaSessionStore::new(&config.session)),
            jwt: JwtCodec::new(&config.auth),
            config: Arc::new(config),
            http,
            cookie_key,
            rate_limiter,
        })
    }

    /// Spawn the database actor for `config.basic.database_url` and build state around it.
    pub async fn from_config(config: Config) -> Result<Self, ApiError> {
        let db = crate::db::spawn(&config.basic.database_url).await?;
        Self::new(config, db)
    }

    /// Whether cookies must carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        !self.config.basic.insecure_cookie
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

async fn not_found_handler() -> ApiError {
    ApiError::not_found("Not Found")
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    ApiError::UnexpectedError(format!("handler panicked: {detail}")).into_response()
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn access_log(req: Request, next: Next) -> Response {
    // Capture request metadata before moving `req` into the handler stack.
    let method = req.method().clone();
    let uri = req.uri().clone();
    let version = req.version();

    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map_or_else(generate_request_id, str::to_string);

    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let start = Instant::now();
    let mut resp = next.run(req).await;

    // Always reflect `x-request-id`, even if the client didn't send one.
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = resp.status();
    let latency_ms = start.elapsed().as_millis();
    let path = uri.path();
    let protocol = format_http_version(version);

    if status.is_server_error() {
        error!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    } else if status.is_client_error() {
        warn!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    } else {
        info!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    }

    resp
}

pub fn app_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(items::router())
        .merge(oauth::router())
        .merge(session::router());

    let cors = cors_layer(&state.config.cors.allow_origins);
    let docs = docs_router(&state.config.docs, &state.config.basic);

    Router::new()
        .merge(system::router())
        .nest("/api/v1", api)
        .fallback(not_found_handler)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .with_state(state)
        .merge(docs)
        .layer(cors)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(access_log))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_short_and_url_safe() {
        let id = generate_request_id();
        assert_eq!(id.len(), 16);
        assert!(
            id.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn http_versions_are_labelled() {
        assert_eq!(format_http_version(Version::HTTP_11), "HTTP/1.1");
        assert_eq!(format_http_version(Version::HTTP_2), "HTTP/2");
    }
}
