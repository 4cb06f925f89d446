use super::{LoginSession, OauthSession, SessionRecord, session_key};
use crate::config::SessionConfig;
use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use std::time::{Duration, Instant};
use tracing::debug;

/// Key-value storage for session records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put_oauth(&self, id: &str, session: OauthSession);

    /// Read and remove a pending OAuth login. A record can be taken once.
    async fn take_oauth(&self, id: &str) -> Option<OauthSession>;

    async fn put_login(&self, id: &str, session: LoginSession);

    async fn get_login(&self, id: &str) -> Option<LoginSession>;

    /// Remove whatever record is stored under `id`. Returns whether one existed.
    async fn remove(&self, id: &str) -> bool;
}

struct RecordExpiry {
    oauth_ttl: Duration,
    login_ttl: Duration,
}

impl Expiry<String, SessionRecord> for RecordExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &SessionRecord,
        _created_at: Instant,
    ) -> Option<Duration> {
        match value {
            SessionRecord::Oauth(_) => Some(self.oauth_ttl),
            SessionRecord::Login(_) => Some(self.login_ttl),
        }
    }

    fn expire_after_update(
        &self,
        key: &String,
        value: &SessionRecord,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        self.expire_after_create(key, value, updated_at)
    }
}

/// In-process [`SessionStore`] backed by a moka cache with per-kind TTLs.
pub struct MokaSessionStore {
    cache: Cache<String, SessionRecord>,
}

impl MokaSessionStore {
    pub fn new(cfg: &SessionConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(cfg.max_capacity.max(1))
            .expire_after(RecordExpiry {
                oauth_ttl: Duration::from_secs(cfg.oauth_ttl_secs.max(1)),
                login_ttl: Duration::from_secs(cfg.login_ttl_secs.max(1)),
            })
            .build();
        Self { cache }
    }
}

#[async_trait]
impl SessionStore for MokaSessionStore {
    async fn put_oauth(&self, id: &str, session: OauthSession) {
        debug!(provider = %session.provider, "storing pending OAuth session");
        self.cache
            .insert(session_key(id), SessionRecord::Oauth(session))
            .await;
    }

    async fn take_oauth(&self, id: &str) -> Option<OauthSession> {
        let key = session_key(id);
        match self.cache.get(&key).await? {
            SessionRecord::Oauth(_) => match self.cache.remove(&key).await? {
                SessionRecord::Oauth(s) => Some(s),
                SessionRecord::Login(_) => None,
            },
            SessionRecord::Login(_) => None,
        }
    }

    async fn put_login(&self, id: &str, session: LoginSession) {
        self.cache
            .insert(session_key(id), SessionRecord::Login(session))
            .await;
    }

    async fn get_login(&self, id: &str) -> Option<LoginSession> {
        match self.cache.get(&session_key(id)).await? {
            SessionRecord::Login(s) => Some(s),
            SessionRecord::Oauth(_) => None,
        }
    }

    async fn remove(&self, id: &str) -> bool {
        self.cache.remove(&session_key(id)).await.is_some()
    }
}
