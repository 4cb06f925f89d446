mod auth;
mod basic;
mod docs;
mod limits;
mod oauth;

pub use auth::{AuthConfig, JwtAlgorithm, SessionConfig};
pub use basic::{BasicConfig, Environment};
pub use docs::{DocsConfig, TelemetryConfig};
pub use limits::{CorsConfig, RateLimitConfig, RateLimitSpec};
pub use oauth::{OauthConfig, OauthProviderConfig};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error as ThisError;

/// Secret shipped in the defaults. Refused outside development/testing.
pub(crate) const INSECURE_SECRET_KEY: &str = "fsdwk4rn23r2lkm23k4n23km324kj34kj";

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "APP_";

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Access-token signing (see `auth` table).
    #[serde(default)]
    pub auth: AuthConfig,

    /// Session cache sizing and lifetimes (see `session` table).
    #[serde(default)]
    pub session: SessionConfig,

    /// Third-party login providers (see `oauth.google`, `oauth.github`, `oauth.facebook`).
    #[serde(default)]
    pub oauth: OauthConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub cors: CorsConfig,

    /// Swagger UI, ReDoc and the OpenAPI document (see `docs` table).
    #[serde(default)]
    pub docs: DocsConfig,

    /// OTLP trace export (see `telemetry` table).
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to extract configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    #[error("config file not found: {0}")]
    MissingFile(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Config {
    /// Defaults for a given deployment environment.
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            basic: BasicConfig::for_environment(environment),
            ..Self::default()
        }
    }

    /// Builds a Figment that merges, in increasing precedence:
    /// environment defaults, the TOML file (if present) and `APP_*` variables.
    ///
    /// Nested keys use `__`, e.g. `APP_AUTH__SECRET_KEY` maps to `auth.secret_key`.
    pub fn figment(environment: Environment, file: Option<&Path>) -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Self::for_environment(
            environment,
        )));
        let figment = match file {
            Some(path) => figment.merge(Toml::file(path)),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                figment.merge(Toml::file(DEFAULT_CONFIG_FILE))
            }
            None => figment,
        };
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads the dotenv file for the current `ENVIRONMENT`, extracts the layered
    /// configuration and validates it.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let environment = Environment::from_env();
        if let Err(e) = dotenvy::from_filename(environment.dotenv_file()) {
            if !e.not_found() {
                return Err(ConfigError::Invalid(format!(
                    "failed to read {}: {e}",
                    environment.dotenv_file()
                )));
            }
        }

        if let Some(path) = file {
            if !path.is_file() {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
        }

        let cfg: Self = Self::figment(environment, file)
            .extract()
            .map_err(|e| ConfigError::Extract(Box::new(e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.secret_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "auth.secret_key must be set and non-empty".to_string(),
            ));
        }
        if self.basic.database_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "basic.database_url must be set and non-empty".to_string(),
            ));
        }
        if self.auth.access_token_expire_minutes == 0 {
            return Err(ConfigError::Invalid(
                "auth.access_token_expire_minutes must be positive".to_string(),
            ));
        }
        self.rate_limit
            .quota()
            .map_err(|e| ConfigError::Invalid(format!("rate_limit.limit: {e}")))?;
        self.docs.validate().map_err(ConfigError::Invalid)?;

        if self.basic.environment == Environment::Production {
            if self.auth.secret_key == INSECURE_SECRET_KEY {
                return Err(ConfigError::Invalid(
                    "auth.secret_key still holds the built-in development key".to_string(),
                ));
            }
            if self.basic.cookie_secret.is_none() {
                return Err(ConfigError::Invalid(
                    "basic.cookie_secret is required in production".to_string(),
                ));
            }
        }
        if let Some(secret) = &self.basic.cookie_secret {
            if secret.len() < 64 {
                return Err(ConfigError::Invalid(
                    "basic.cookie_secret must be at least 64 bytes".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_defaults_validate() {
        let cfg = Config::for_environment(Environment::Development);
        assert!(cfg.basic.debug);
        assert_eq!(cfg.basic.database_url, "sqlite://dev.db");
        cfg.validate().expect("development defaults are valid");
    }

    #[test]
    fn production_refuses_builtin_secrets() {
        let mut cfg = Config::for_environment(Environment::Production);
        cfg.basic.database_url = "sqlite://prod.db".to_string();
        let err = cfg.validate().expect_err("insecure secret must be refused");
        assert!(err.to_string().contains("secret_key"));

        cfg.auth.secret_key = "a-real-secret".to_string();
        cfg.basic.cookie_secret = Some("k".repeat(64));
        cfg.validate().expect("production config with real secrets is valid");
    }

    #[test]
    fn production_has_no_default_database() {
        let cfg = Config::for_environment(Environment::Production);
        assert!(cfg.basic.database_url.is_empty());
        assert!(!cfg.basic.debug);
    }

    #[test]
    fn toml_overrides_defaults() {
        let figment = Config::figment(Environment::Testing, None).merge(Toml::string(
            r#"
            [basic]
            listen_port = 9100

            [auth]
            algorithm = "HS512"
            access_token_expire_minutes = 5

            [rate_limit]
            limit = "10/second"

            [docs]
            docs_url = "/docs"

            [telemetry]
            otlp_endpoint = "http://localhost:4318/v1/traces"

            [telemetry.headers]
            x-hdx-auth-token = "abc"
            "#,
        ));
        let cfg: Config = figment.extract().expect("config extracts");
        assert_eq!(cfg.basic.listen_port, 9100);
        assert_eq!(cfg.basic.database_url, "sqlite://test.db");
        assert_eq!(cfg.auth.algorithm, JwtAlgorithm::HS512);
        assert_eq!(cfg.auth.access_token_expire_minutes, 5);
        assert_eq!(cfg.rate_limit.limit, "10/second");
        assert_eq!(cfg.docs.docs_url, "/docs");
        assert_eq!(cfg.docs.redoc_url, "/redoc");
        assert_eq!(
            cfg.telemetry.otlp_endpoint.as_deref(),
            Some("http://localhost:4318/v1/traces")
        );
        assert_eq!(cfg.telemetry.headers["x-hdx-auth-token"], "abc");
        assert_eq!(cfg.telemetry.service_name, "keystone");
    }
}
