//! Process configuration read from the environment once at startup.

use std::net::SocketAddr;

use thiserror::Error;

pub const STORE_URL_VAR: &str = "IPC_STORE_URL";
pub const STORE_KEY_VAR: &str = "IPC_STORE_KEY";
pub const BIND_ADDR_VAR: &str = "IPC_BIND_ADDR";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Connection details for the hosted database/auth service.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Base URL without a trailing slash.
    pub url: String,
    /// Project API key sent as `apikey` and bearer token.
    pub key: String,
    pub timeout_secs: u64,
}

impl core::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl StoreConfig {
    /// Both variables are required; an absent or blank value is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = required(&lookup, STORE_URL_VAR)?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                name: STORE_URL_VAR,
                reason: "must be an http(s) URL".to_string(),
            });
        }
        let key = required(&lookup, STORE_KEY_VAR)?;

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            key,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = lookup(BIND_ADDR_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw.parse().map_err(|e| ConfigError::Invalid {
            name: BIND_ADDR_VAR,
            reason: format!("{e}"),
        })?;
        Ok(Self { bind_addr })
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn store_config_requires_both_variables() {
        assert_eq!(
            StoreConfig::from_lookup(env(&[(STORE_KEY_VAR, "k")])),
            Err(ConfigError::Missing(STORE_URL_VAR))
        );
        assert_eq!(
            StoreConfig::from_lookup(env(&[(STORE_URL_VAR, "https://x.example"), (STORE_KEY_VAR, "  ")])),
            Err(ConfigError::Missing(STORE_KEY_VAR))
        );
    }

    #[test]
    fn store_url_is_normalized() {
        let cfg = StoreConfig::from_lookup(env(&[
            (STORE_URL_VAR, "https://project.example/"),
            (STORE_KEY_VAR, "anon-key"),
        ]))
        .unwrap();
        assert_eq!(cfg.url, "https://project.example");
        assert!(!format!("{cfg:?}").contains("anon-key"));
    }

    #[test]
    fn store_url_must_be_http() {
        let err = StoreConfig::from_lookup(env(&[
            (STORE_URL_VAR, "project.example"),
            (STORE_KEY_VAR, "k"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: STORE_URL_VAR, .. }));
    }

    #[test]
    fn bind_addr_defaults_and_parses() {
        let cfg = ServerConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(cfg.bind_addr.port(), 8080);

        let cfg = ServerConfig::from_lookup(env(&[(BIND_ADDR_VAR, "127.0.0.1:9000")])).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), "127.0.0.1:9000");

        assert!(ServerConfig::from_lookup(env(&[(BIND_ADDR_VAR, "nope")])).is_err());
    }
}
