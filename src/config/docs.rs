use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Interactive API documentation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocsConfig {
    /// TOML: `docs.enabled`. Default: `true`.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Swagger UI mount point. TOML: `docs.docs_url`. Default: `/swagger`.
    #[serde(default = "default_docs_url")]
    pub docs_url: String,

    /// ReDoc page. TOML: `docs.redoc_url`. Default: `/redoc`.
    #[serde(default = "default_redoc_url")]
    pub redoc_url: String,

    /// Raw OpenAPI document. TOML: `docs.openapi_url`. Default: `/openapi.json`.
    #[serde(default = "default_openapi_url")]
    pub openapi_url: String,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            docs_url: default_docs_url(),
            redoc_url: default_redoc_url(),
            openapi_url: default_openapi_url(),
        }
    }
}

impl DocsConfig {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }
        let urls = [
            ("docs.docs_url", &self.docs_url),
            ("docs.redoc_url", &self.redoc_url),
            ("docs.openapi_url", &self.openapi_url),
        ];
        for (key, url) in urls {
            if !url.starts_with('/') || url.len() < 2 || url.ends_with('/') {
                return Err(format!("{key} must be an absolute path like `/docs`, got `{url}`"));
            }
        }
        if self.docs_url == self.redoc_url
            || self.docs_url == self.openapi_url
            || self.redoc_url == self.openapi_url
        {
            return Err("docs urls must be distinct".to_string());
        }
        Ok(())
    }
}

fn default_enabled() -> bool {
    true
}

fn default_docs_url() -> String {
    "/swagger".to_string()
}

fn default_redoc_url() -> String {
    "/redoc".to_string()
}

fn default_openapi_url() -> String {
    "/openapi.json".to_string()
}

/// OTLP trace export. Disabled while `otlp_endpoint` is unset.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Collector URL for OTLP over HTTP, e.g. `https://in-otel.hyperdx.io/v1/traces`.
    /// TOML: `telemetry.otlp_endpoint`. Env: `APP_TELEMETRY__OTLP_ENDPOINT`.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// Extra headers sent with every export, e.g. `authorization` or `x-hdx-auth-token`.
    /// TOML: `[telemetry.headers]`.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// `service.name` resource attribute. TOML: `telemetry.service_name`. Default: `keystone`.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            headers: BTreeMap::new(),
            service_name: default_service_name(),
        }
    }
}

fn default_service_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docs_paths_are_checked_only_when_enabled() {
        let mut docs = DocsConfig::default();
        docs.validate().expect("defaults are valid");

        docs.redoc_url = "redoc".to_string();
        assert!(docs.validate().unwrap_err().contains("docs.redoc_url"));

        docs.redoc_url = "/swagger".to_string();
        assert!(docs.validate().unwrap_err().contains("distinct"));

        docs.enabled = false;
        docs.validate().expect("disabled docs are not checked");
    }
}
