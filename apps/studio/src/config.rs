use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Base URL of the generation service (`/generate`, `/validate-key`).
    pub generation_url: String,
    /// Where the credential is persisted. In memory when unset.
    pub credential_file: Option<PathBuf>,
    pub server_retry_delay: Duration,
    pub rate_limit_cooldown_secs: u32,
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            rust_log: "info".to_string(),
            generation_url: "http://127.0.0.1:8000".to_string(),
            credential_file: None,
            server_retry_delay: Duration::from_secs(60),
            rate_limit_cooldown_secs: 60,
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();
        let parsed = |key: &str, default: u64| -> Result<u64> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("{key} must be a non-negative integer")),
                None => Ok(default),
            }
        };

        Ok(Config {
            port: match lookup("PORT") {
                Some(raw) => raw
                    .trim()
                    .parse::<u16>()
                    .context("PORT must be a valid port number")?,
                None => defaults.port,
            },
            rust_log: lookup("RUST_LOG").unwrap_or(defaults.rust_log),
            generation_url: lookup("GENERATION_URL").unwrap_or(defaults.generation_url),
            credential_file: lookup("CREDENTIAL_FILE")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            server_retry_delay: Duration::from_secs(parsed(
                "SERVER_RETRY_DELAY_SECS",
                defaults.server_retry_delay.as_secs(),
            )?),
            rate_limit_cooldown_secs: u32::try_from(parsed(
                "RATE_LIMIT_COOLDOWN_SECS",
                u64::from(defaults.rate_limit_cooldown_secs),
            )?)
            .context("RATE_LIMIT_COOLDOWN_SECS is too large")?,
            request_timeout: Duration::from_secs(parsed(
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.generation_url, "http://127.0.0.1:8000");
        assert!(config.credential_file.is_none());
        assert_eq!(config.server_retry_delay, Duration::from_secs(60));
        assert_eq!(config.rate_limit_cooldown_secs, 60);
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("CREDENTIAL_FILE", "/tmp/cred.json"),
            ("SERVER_RETRY_DELAY_SECS", "5"),
            ("RATE_LIMIT_COOLDOWN_SECS", "30"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.credential_file, Some(PathBuf::from("/tmp/cred.json")));
        assert_eq!(config.server_retry_delay, Duration::from_secs(5));
        assert_eq!(config.rate_limit_cooldown_secs, 30);
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
