//! Provider configuration.
//!
//! The provider block carries the Kibana URL, credentials and connection
//! settings. `url`, `username` and `password` fall back to the `KIBANA_URL`,
//! `KIBANA_USERNAME` and `KIBANA_PASSWORD` environment variables when they
//! are not set in configuration.
//!
//! The password is held as a [`SecretString`] so it never shows up in
//! `Debug` output or log fields.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use crate::error::ProviderError;

/// Environment variable for the Kibana URL.
pub const ENV_URL: &str = "KIBANA_URL";
/// Environment variable for the basic-auth username.
pub const ENV_USERNAME: &str = "KIBANA_USERNAME";
/// Environment variable for the basic-auth password.
pub const ENV_PASSWORD: &str = "KIBANA_PASSWORD";

/// Serializes an optional `SecretString` as a plain string.
mod optional_secret {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(secret: &Option<SecretString>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        secret.as_ref().map(|s| s.expose_secret()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.map(|s| SecretString::new(s.into())))
    }
}

/// Settings of the provider block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Kibana base URL.
    #[serde(default)]
    pub url: String,
    /// Basic-auth username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Basic-auth password.
    #[serde(default, with = "optional_secret", skip_serializing_if = "Option::is_none")]
    pub password: Option<SecretString>,
    /// Custom CA certificate files.
    #[serde(default)]
    pub cacert_files: Vec<String>,
    /// Disable TLS certificate verification.
    #[serde(default)]
    pub insecure: bool,
    /// How many times the status check is retried before giving up.
    #[serde(default = "default_retry")]
    pub retry: u32,
    /// Seconds to wait between status checks.
    #[serde(default = "default_wait_before_retry")]
    pub wait_before_retry: u64,
    /// Log at debug level.
    #[serde(default)]
    pub debug: bool,
}

fn default_retry() -> u32 {
    6
}

fn default_wait_before_retry() -> u64 {
    10
}

impl ProviderConfig {
    /// Parse the provider block, reading missing values from the process
    /// environment.
    pub fn from_value(config: Value) -> Result<Self, ProviderError> {
        Self::from_value_with_env(config, |key| std::env::var(key).ok())
    }

    /// Parse the provider block with an explicit environment lookup.
    pub fn from_value_with_env<F>(config: Value, env: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = match config {
            Value::Null => json!({}),
            other => other,
        };
        let mut parsed: ProviderConfig = serde_json::from_value(config)?;
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if parsed.url.trim().is_empty() {
            parsed.url = lookup(ENV_URL).ok_or_else(|| {
                ProviderError::Configuration(format!("url is required (or set {})", ENV_URL))
            })?;
        }
        if blank(&parsed.username) {
            parsed.username = lookup(ENV_USERNAME);
        }
        let password_blank = parsed
            .password
            .as_ref()
            .map_or(true, |p| p.expose_secret().trim().is_empty());
        if password_blank {
            parsed.password = lookup(ENV_PASSWORD).map(|p| SecretString::new(p.into()));
        }

        parsed.base_url()?;
        Ok(parsed)
    }

    /// The parsed Kibana URL.
    pub fn base_url(&self) -> Result<Url, ProviderError> {
        let url = Url::parse(&self.url)
            .map_err(|e| ProviderError::Configuration(format!("invalid url '{}': {}", self.url, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ProviderError::Configuration(format!(
                "unsupported url scheme '{}', expected http or https",
                scheme
            ))),
        }
    }

    /// Basic-auth credentials, only when both parts are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let password = self.password.as_ref().map(|p| p.expose_secret());
        match (self.username.as_deref(), password) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }

    /// Delay between status checks.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.wait_before_retry)
    }

    /// State of the `kibana_host` data source.
    pub fn host(&self) -> Value {
        let (username, password) = self.credentials().unwrap_or(("", ""));
        json!({
            "id": self.url,
            "url": self.url,
            "username": username,
            "password": password,
        })
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ProviderConfig::from_value_with_env(json!({"url": "http://kibana:5601"}), env(&[])).unwrap();

        assert_eq!(config.retry, 6);
        assert_eq!(config.wait_before_retry, 10);
        assert_eq!(config.retry_delay(), Duration::from_secs(10));
        assert!(!config.insecure);
        assert!(!config.debug);
        assert!(config.cacert_files.is_empty());
        assert!(config.credentials().is_none());
    }

    #[test]
    fn test_env_fallback() {
        let config = ProviderConfig::from_value_with_env(
            Value::Null,
            env(&[
                (ENV_URL, "https://kibana.example.com"),
                (ENV_USERNAME, "elastic"),
                (ENV_PASSWORD, "changeme"),
            ]),
        )
        .unwrap();

        assert_eq!(config.url, "https://kibana.example.com");
        assert_eq!(config.credentials(), Some(("elastic", "changeme")));
        assert_eq!(config.base_url().unwrap().host_str(), Some("kibana.example.com"));
    }

    #[test]
    fn test_explicit_values_win_over_env() {
        let config = ProviderConfig::from_value_with_env(
            json!({"url": "http://localhost:5601", "username": "admin", "password": "secret"}),
            env(&[(ENV_URL, "http://other:5601"), (ENV_USERNAME, "elastic")]),
        )
        .unwrap();

        assert_eq!(config.url, "http://localhost:5601");
        assert_eq!(config.credentials(), Some(("admin", "secret")));
    }

    #[test]
    fn test_missing_url() {
        let err = ProviderConfig::from_value_with_env(json!({}), env(&[(ENV_URL, "  ")])).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert!(err.message().contains(ENV_URL));
    }

    #[test]
    fn test_invalid_url() {
        let err = ProviderConfig::from_value_with_env(json!({"url": "not a url"}), env(&[])).unwrap_err();
        assert!(err.message().starts_with("invalid url"));

        let err = ProviderConfig::from_value_with_env(json!({"url": "ftp://kibana"}), env(&[])).unwrap_err();
        assert!(err.message().contains("unsupported url scheme"));
    }

    #[test]
    fn test_wrong_type_is_serialization_error() {
        let err = ProviderConfig::from_value_with_env(
            json!({"url": "http://kibana", "retry": "six"}),
            env(&[]),
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::Serialization(_)));
    }

    #[test]
    fn test_credentials_need_both_parts() {
        let config = ProviderConfig::from_value_with_env(
            json!({"url": "http://kibana", "username": "elastic"}),
            env(&[]),
        )
        .unwrap();
        assert!(config.credentials().is_none());
    }

    #[test]
    fn test_password_hidden_from_debug() {
        let config = ProviderConfig::from_value_with_env(
            json!({"url": "http://kibana:5601", "username": "elastic"}),
            env(&[(ENV_PASSWORD, "s3cr3t-kibana")]),
        )
        .unwrap();

        assert!(!format!("{:?}", config).contains("s3cr3t-kibana"));
        assert_eq!(config.credentials(), Some(("elastic", "s3cr3t-kibana")));
    }

    #[test]
    fn test_password_serde() {
        let config = ProviderConfig::from_value_with_env(
            json!({"url": "http://kibana", "username": "elastic", "password": "changeme"}),
            env(&[]),
        )
        .unwrap();
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["password"], "changeme");

        let config = ProviderConfig::from_value_with_env(json!({"url": "http://kibana"}), env(&[])).unwrap();
        let value = serde_json::to_value(&config).unwrap();
        assert!(value.get("password").is_none());
    }

    #[test]
    fn test_host_state() {
        let config = ProviderConfig::from_value_with_env(
            json!({"url": "http://kibana:5601", "username": "elastic", "password": "changeme", "insecure": true}),
            env(&[]),
        )
        .unwrap();

        let host = config.host();
        assert_eq!(host["id"], "http://kibana:5601");
        assert_eq!(host["url"], "http://kibana:5601");
        assert_eq!(host["username"], "elastic");
        assert_eq!(host["password"], "changeme");
        assert!(config.insecure);
    }
}
