use governor::Quota;
use serde::{Deserialize, Serialize};
use std::{num::NonZeroU32, str::FromStr, time::Duration};
use thiserror::Error as ThisError;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// TOML: `rate_limit.enabled`. Default: `true`.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Quota per client, written as `<count>/<second|minute|hour|day>`.
    /// TOML: `rate_limit.limit`. Default: `5/minute`.
    #[serde(default = "default_limit")]
    pub limit: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            limit: default_limit(),
        }
    }
}

impl RateLimitConfig {
    pub fn quota(&self) -> Result<Quota, RateLimitSpecError> {
        self.limit.parse::<RateLimitSpec>().map(Quota::from)
    }
}

fn default_enabled() -> bool {
    true
}

fn default_limit() -> String {
    "5/minute".to_string()
}

/// Parsed form of a `"<count>/<period>"` rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSpec {
    pub count: NonZeroU32,
    pub period: Duration,
}

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum RateLimitSpecError {
    #[error("expected `<count>/<period>`, got `{0}`")]
    Format(String),

    #[error("count must be a positive integer, got `{0}`")]
    Count(String),

    #[error("unknown period `{0}` (use second, minute, hour or day)")]
    Period(String),
}

impl FromStr for RateLimitSpec {
    type Err = RateLimitSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (count, period) = s
            .split_once('/')
            .ok_or_else(|| RateLimitSpecError::Format(s.to_string()))?;

        let count = count
            .trim()
            .parse::<u32>()
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or_else(|| RateLimitSpecError::Count(count.trim().to_string()))?;

        let secs = match period.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "second" | "seconds" => 1,
            "m" | "min" | "minute" | "minutes" => 60,
            "h" | "hour" | "hours" => 60 * 60,
            "d" | "day" | "days" => 24 * 60 * 60,
            other => return Err(RateLimitSpecError::Period(other.to_string())),
        };

        Ok(Self {
            count,
            period: Duration::from_secs(secs),
        })
    }
}

impl From<RateLimitSpec> for Quota {
    /// `count` requests may be spent at once, then one is replenished every
    /// `period / count`.
    fn from(spec: RateLimitSpec) -> Self {
        let interval = spec.period / spec.count.get();
        Quota::with_period(interval)
            .unwrap_or_else(|| Quota::per_second(spec.count))
            .allow_burst(spec.count)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    /// Origins allowed to call the API from a browser.
    /// TOML: `cors.allow_origins`.
    #[serde(default = "default_allow_origins")]
    pub allow_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: default_allow_origins(),
        }
    }
}

fn default_allow_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:8000".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_count_and_period() {
        let spec: RateLimitSpec = "5/minute".parse().expect("valid spec");
        assert_eq!(spec.count.get(), 5);
        assert_eq!(spec.period, Duration::from_secs(60));

        let spec: RateLimitSpec = " 100 / Second ".parse().expect("valid spec");
        assert_eq!(spec.count.get(), 100);
        assert_eq!(spec.period, Duration::from_secs(1));
    }

    #[test]
    fn rejects_malformed_specs() {
        assert_eq!(
            "five/minute".parse::<RateLimitSpec>(),
            Err(RateLimitSpecError::Count("five".to_string()))
        );
        assert_eq!(
            "0/minute".parse::<RateLimitSpec>(),
            Err(RateLimitSpecError::Count("0".to_string()))
        );
        assert_eq!(
            "5/fortnight".parse::<RateLimitSpec>(),
            Err(RateLimitSpecError::Period("fortnight".to_string()))
        );
        assert!(matches!(
            "5".parse::<RateLimitSpec>(),
            Err(RateLimitSpecError::Format(_))
        ));
    }

    #[test]
    fn quota_allows_full_burst() {
        let quota = Quota::from("3/hour".parse::<RateLimitSpec>().expect("valid spec"));
        assert_eq!(quota.burst_size().get(), 3);
        assert_eq!(quota.replenish_interval(), Duration::from_secs(20 * 60));
    }
}
