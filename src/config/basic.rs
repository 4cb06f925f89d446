use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};

/// Deployment environment, selected with the `ENVIRONMENT` variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Testing,
    Production,
}

impl Environment {
    /// Reads `ENVIRONMENT`; anything other than `development` or `testing` is production.
    pub fn from_env() -> Self {
        match std::env::var("ENVIRONMENT").as_deref() {
            Err(_) | Ok("development" | "dev") => Self::Development,
            Ok("testing" | "test") => Self::Testing,
            Ok(_) => Self::Production,
        }
    }

    pub fn dotenv_file(self) -> &'static str {
        match self {
            Self::Development => ".env.dev",
            Self::Testing => ".env.test",
            Self::Production => ".env.prod",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Testing => "testing",
            Self::Production => "production",
        }
    }
}

/// Basic (core) configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    /// HTTP server listen address (e.g., "0.0.0.0", "127.0.0.1").
    /// TOML: `basic.listen_addr`. Default: `0.0.0.0`.
    #[serde(default = "default_listen_ip")]
    pub listen_addr: IpAddr,

    /// HTTP server listen port.
    /// TOML: `basic.listen_port`. Default: `8000`.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Database URL for SQLite.
    /// TOML: `basic.database_url`. Default depends on the environment.
    #[serde(default)]
    pub database_url: String,

    /// Log level for tracing subscriber initialization (e.g., "error", "warn", "info", "debug", "trace").
    /// TOML: `basic.loglevel`. Default: `info`.
    #[serde(default)]
    pub loglevel: String,

    /// TOML: `basic.app_name`. Default: `REST API Boilerplate`.
    #[serde(default)]
    pub app_name: String,

    /// TOML: `basic.version`. Default: the crate version.
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub environment: Environment,

    /// Exposes extra diagnostics on `/config`. Default: on in development only.
    #[serde(default)]
    pub debug: bool,

    /// Send cookies without the `Secure` flag (plain-HTTP local development).
    /// TOML: `basic.insecure_cookie`. Default: `false`.
    #[serde(default)]
    pub insecure_cookie: bool,

    /// Master key (>= 64 bytes) for encrypting the session cookie. When unset a
    /// random key is generated at startup, which logs everyone out on restart.
    /// TOML: `basic.cookie_secret`.
    #[serde(default)]
    pub cookie_secret: Option<String>,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self::for_environment(Environment::Development)
    }
}

impl BasicConfig {
    pub fn for_environment(environment: Environment) -> Self {
        let (debug, database_url) = match environment {
            Environment::Development => (true, "sqlite://dev.db"),
            Environment::Testing => (false, "sqlite://test.db"),
            // No default database for production. `Config::validate()` enforces one.
            Environment::Production => (false, ""),
        };
        Self {
            listen_addr: default_listen_ip(),
            listen_port: default_listen_port(),
            database_url: database_url.to_string(),
            loglevel: "info".to_string(),
            app_name: "REST API Boilerplate".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment,
            debug,
            insecure_cookie: false,
            cookie_secret: None,
        }
    }
}

/// Default IP address for the HTTP server listen address.
fn default_listen_ip() -> IpAddr {
    Ipv4Addr::new(0, 0, 0, 0).into()
}

/// Default port for the HTTP server.
fn default_listen_port() -> u16 {
    8000
}
