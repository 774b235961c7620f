//! Tracker configuration.

use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_CACHE_COOLDOWN_SECS: u64 = 5;
pub const DEFAULT_STALL_TIMEOUT_SECS: u64 = 30 * 60;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}={value}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime settings of the job status tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Base URL of the processing backend.
    pub api_base_url: String,
    /// Fixed interval between batch status polls.
    pub poll_interval: Duration,
    /// How long a Result Store snapshot is served without refetching.
    pub cache_cooldown: Duration,
    /// Report non-terminal jobs silent for this long. `None` disables the check.
    pub stall_timeout: Option<Duration>,
    /// Per-request HTTP timeout. `None` waits indefinitely.
    pub http_timeout: Option<Duration>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            cache_cooldown: Duration::from_secs(DEFAULT_CACHE_COOLDOWN_SECS),
            stall_timeout: Some(Duration::from_secs(DEFAULT_STALL_TIMEOUT_SECS)),
            http_timeout: Some(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS)),
        }
    }
}

impl TrackerConfig {
    /// Build a config from environment variables.
    ///
    /// - `PODCAST_API_BASE_URL` (default: `http://localhost:5000`)
    /// - `POLL_INTERVAL_SECS` (default: 5, must be > 0)
    /// - `RESULT_CACHE_COOLDOWN_SECS` (default: 5)
    /// - `JOB_STALL_TIMEOUT_SECS` (default: 1800, `0` disables)
    /// - `HTTP_TIMEOUT_SECS` (default: 30, `0` disables)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_base_url = get("PODCAST_API_BASE_URL").unwrap_or(defaults.api_base_url);

        let poll_secs = parse_secs("POLL_INTERVAL_SECS", get("POLL_INTERVAL_SECS"))?
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        if poll_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "POLL_INTERVAL_SECS",
                value: "0".into(),
                reason: "poll interval must be positive".into(),
            });
        }

        let cooldown_secs = parse_secs(
            "RESULT_CACHE_COOLDOWN_SECS",
            get("RESULT_CACHE_COOLDOWN_SECS"),
        )?
        .unwrap_or(DEFAULT_CACHE_COOLDOWN_SECS);

        let stall_secs = parse_secs("JOB_STALL_TIMEOUT_SECS", get("JOB_STALL_TIMEOUT_SECS"))?
            .unwrap_or(DEFAULT_STALL_TIMEOUT_SECS);
        let http_secs = parse_secs("HTTP_TIMEOUT_SECS", get("HTTP_TIMEOUT_SECS"))?
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);

        Ok(Self {
            api_base_url,
            poll_interval: Duration::from_secs(poll_secs),
            cache_cooldown: Duration::from_secs(cooldown_secs),
            stall_timeout: non_zero(stall_secs),
            http_timeout: non_zero(http_secs),
        })
    }
}

fn non_zero(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn parse_secs(var: &'static str, value: Option<String>) -> Result<Option<u64>, ConfigError> {
    value
        .map(|v| {
            v.parse::<u64>().map_err(|e| ConfigError::Invalid {
                var,
                value: v.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::disallowed_methods)]

    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = TrackerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, TrackerConfig::default());
    }

    #[test]
    fn reads_overrides_and_zero_disables() {
        let cfg = TrackerConfig::from_lookup(lookup(&[
            ("PODCAST_API_BASE_URL", "https://api.example.com"),
            ("POLL_INTERVAL_SECS", "10"),
            ("JOB_STALL_TIMEOUT_SECS", "0"),
            ("HTTP_TIMEOUT_SECS", " 0 "),
        ]))
        .unwrap();
        assert_eq!(cfg.api_base_url, "https://api.example.com");
        assert_eq!(cfg.poll_interval, Duration::from_secs(10));
        assert_eq!(cfg.stall_timeout, None);
        assert_eq!(cfg.http_timeout, None);
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(TrackerConfig::from_lookup(lookup(&[("POLL_INTERVAL_SECS", "fast")])).is_err());
        assert!(TrackerConfig::from_lookup(lookup(&[("POLL_INTERVAL_SECS", "0")])).is_err());
    }
}
