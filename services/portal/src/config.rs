//! services/portal/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub base_url: String,
    pub request_timeout: Duration,
    pub log_level: Level,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to keep tests hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // --- Load API Settings ---
        let base_url = lookup("PORTAL_BASE_URL")
            .unwrap_or_else(|| "http://127.0.0.1:5000".to_string())
            .trim_end_matches('/')
            .to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(
                "PORTAL_BASE_URL".to_string(),
                format!("'{}' is not an http(s) URL", base_url),
            ));
        }

        let timeout_str = lookup("PORTAL_TIMEOUT_SECS").unwrap_or_else(|| "10".to_string());
        let timeout_secs = timeout_str.parse::<u64>().map_err(|e| {
            ConfigError::InvalidValue("PORTAL_TIMEOUT_SECS".to_string(), e.to_string())
        })?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Credentials (as optional) ---
        let email = lookup("PORTAL_EMAIL").filter(|v| !v.trim().is_empty());
        let password = lookup("PORTAL_PASSWORD").filter(|v| !v.is_empty());

        Ok(Self {
            base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            log_level,
            email,
            password,
        })
    }

    /// The login credentials, which the binary cannot run without.
    pub fn credentials(&self) -> Result<(String, String), ConfigError> {
        let email = self
            .email
            .clone()
            .ok_or_else(|| ConfigError::MissingVar("PORTAL_EMAIL".to_string()))?;
        let password = self
            .password
            .clone()
            .ok_or_else(|| ConfigError::MissingVar("PORTAL_PASSWORD".to_string()))?;
        Ok((email, password))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.log_level, Level::INFO);
        assert!(config.email.is_none());
        assert!(matches!(config.credentials(), Err(ConfigError::MissingVar(_))));
    }

    #[test]
    fn reads_and_normalizes_values() {
        let config = Config::from_lookup(lookup(&[
            ("PORTAL_BASE_URL", "https://portal.example.edu/"),
            ("PORTAL_TIMEOUT_SECS", "3"),
            ("RUST_LOG", "debug"),
            ("PORTAL_EMAIL", "ada@example.edu"),
            ("PORTAL_PASSWORD", "secret"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://portal.example.edu");
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(
            config.credentials().unwrap(),
            ("ada@example.edu".to_string(), "secret".to_string())
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("PORTAL_TIMEOUT_SECS", "soon")])),
            Err(ConfigError::InvalidValue(var, _)) if var == "PORTAL_TIMEOUT_SECS"
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("RUST_LOG", "chatty")])),
            Err(ConfigError::InvalidValue(var, _)) if var == "RUST_LOG"
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("PORTAL_BASE_URL", "ftp://x")])),
            Err(ConfigError::InvalidValue(var, _)) if var == "PORTAL_BASE_URL"
        ));
    }
}
