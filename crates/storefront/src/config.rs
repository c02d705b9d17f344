//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `MERCADITO_API_URL` - Base URL of the remote catalog service
//!   (default: `https://api.escuelajs.co/api/v1`)
//! - `MERCADITO_STORAGE_PATH` - Path of the local state file
//!   (default: `mercadito.json`)
//! - `MERCADITO_REQUEST_TIMEOUT_SECS` - Per-request HTTP timeout in seconds
//!   (default: 10)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default base URL of the remote catalog service.
pub const DEFAULT_API_URL: &str = "https://api.escuelajs.co/api/v1";
/// Default path of the local state file.
pub const DEFAULT_STORAGE_PATH: &str = "mercadito.json";
/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Base URL of the remote catalog service
    pub api_url: Url,
    /// Path of the local state file
    pub storage_path: PathBuf,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(
            "MERCADITO_API_URL",
            &get_env_or_default("MERCADITO_API_URL", DEFAULT_API_URL),
        )?;
        let storage_path = PathBuf::from(get_env_or_default(
            "MERCADITO_STORAGE_PATH",
            DEFAULT_STORAGE_PATH,
        ));
        let request_timeout = parse_timeout(
            "MERCADITO_REQUEST_TIMEOUT_SECS",
            &get_env_or_default(
                "MERCADITO_REQUEST_TIMEOUT_SECS",
                &DEFAULT_REQUEST_TIMEOUT_SECS.to_string(),
            ),
        )?;

        Ok(Self {
            api_url,
            storage_path,
            request_timeout,
        })
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse and validate the catalog service base URL.
fn parse_api_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    Ok(url)
}

/// Parse the request timeout in whole seconds.
fn parse_timeout(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs = raw
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "timeout must be positive".to_string(),
        ));
    }

    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_url_accepts_http_and_https() {
        assert!(parse_api_url("TEST_VAR", "https://api.example.com/api/v1").is_ok());
        assert!(parse_api_url("TEST_VAR", "http://localhost:3000/api/v1").is_ok());
    }

    #[test]
    fn test_parse_api_url_rejects_other_schemes() {
        let err = parse_api_url("TEST_VAR", "ftp://api.example.com").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_parse_api_url_rejects_garbage() {
        assert!(parse_api_url("TEST_VAR", "not a url").is_err());
    }

    #[test]
    fn test_parse_timeout_whole_seconds() {
        assert_eq!(
            parse_timeout("TEST_VAR", "30").unwrap(),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_parse_timeout_rejects_zero_and_garbage() {
        assert!(parse_timeout("TEST_VAR", "0").is_err());
        assert!(parse_timeout("TEST_VAR", "ten").is_err());
    }

    #[test]
    fn test_default_config_uses_documented_values() {
        let config = StorefrontConfig::default();
        assert_eq!(config.api_url.as_str(), DEFAULT_API_URL);
        assert_eq!(config.storage_path, PathBuf::from(DEFAULT_STORAGE_PATH));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }
}
