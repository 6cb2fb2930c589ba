//! Client configuration.
//!
//! Loaded from a TOML file when one is given, then overlaid with
//! `TRIPROTOCOL_*` environment variables and validated.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use triprotocol_fabric::Protocol;

const ENV_STRING_ADDRESS: &str = "TRIPROTOCOL_STRING_ADDRESS";
const ENV_JSON_ADDRESS: &str = "TRIPROTOCOL_JSON_ADDRESS";
const ENV_PROTOBUF_ADDRESS: &str = "TRIPROTOCOL_PROTOBUF_ADDRESS";
const ENV_TCP_TIMEOUT: &str = "TRIPROTOCOL_TCP_TIMEOUT_SECS";

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Application name reported in logs.
    pub name: String,

    pub version: String,

    /// Per-phase deadline applied to dial, send and receive.
    pub tcp_timeout_secs: u64,

    /// One server address per protocol.
    pub servers: ServerAddresses,
}

/// `host:port` of the server speaking each protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerAddresses {
    pub string: String,
    pub json: String,
    pub protobuf: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: "triprotocol".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            tcp_timeout_secs: 10,
            servers: ServerAddresses::default(),
        }
    }
}

impl Default for ServerAddresses {
    fn default() -> Self {
        Self {
            string: "127.0.0.1:8080".to_string(),
            json: "127.0.0.1:8081".to_string(),
            protobuf: "127.0.0.1:8082".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Overlay values from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`, keyed by environment variable name.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(address) = lookup(ENV_STRING_ADDRESS) {
            self.servers.string = address;
        }
        if let Some(address) = lookup(ENV_JSON_ADDRESS) {
            self.servers.json = address;
        }
        if let Some(address) = lookup(ENV_PROTOBUF_ADDRESS) {
            self.servers.protobuf = address;
        }
        if let Some(raw) = lookup(ENV_TCP_TIMEOUT) {
            self.tcp_timeout_secs = raw.trim().parse().map_err(|_| {
                ConfigError::Validation(format!("{ENV_TCP_TIMEOUT} is not a number: {raw}"))
            })?;
        }
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the timeout is zero or any
    /// address is not `host:port`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tcp_timeout_secs < 1 {
            return Err(ConfigError::Validation(
                "tcp_timeout_secs must be at least 1".to_string(),
            ));
        }
        for protocol in Protocol::ALL {
            validate_address(protocol, self.address_for(protocol))?;
        }
        Ok(())
    }

    pub fn tcp_timeout(&self) -> Duration {
        Duration::from_secs(self.tcp_timeout_secs)
    }

    /// Server address for `protocol`.
    pub fn address_for(&self, protocol: Protocol) -> &str {
        match protocol {
            Protocol::String => &self.servers.string,
            Protocol::Json => &self.servers.json,
            Protocol::Binary => &self.servers.protobuf,
        }
    }
}

fn validate_address(protocol: Protocol, address: &str) -> Result<(), ConfigError> {
    let valid = address
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok_and(|p| p > 0));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "{protocol} server address must be host:port, got {address:?}"
        )))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ClientConfig::default();
        config.validate().unwrap();
        assert_eq!(config.tcp_timeout(), Duration::from_secs(10));
        assert_eq!(config.address_for(Protocol::String), "127.0.0.1:8080");
        assert_eq!(config.address_for(Protocol::Json), "127.0.0.1:8081");
        assert_eq!(config.address_for(Protocol::Binary), "127.0.0.1:8082");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ClientConfig::from_toml(
            r#"
            tcp_timeout_secs = 3

            [servers]
            json = "server.local:9001"
            "#,
        )
        .unwrap();

        assert_eq!(config.tcp_timeout_secs, 3);
        assert_eq!(config.servers.json, "server.local:9001");
        assert_eq!(config.servers.string, "127.0.0.1:8080");
        assert_eq!(config.name, "triprotocol");
    }

    #[test]
    fn test_invalid_toml() {
        let err = ClientConfig::from_toml("tcp_timeout_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = ClientConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(ClientConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_env_overrides() {
        let config = ClientConfig::default()
            .with_overrides(env(&[
                ("TRIPROTOCOL_PROTOBUF_ADDRESS", "10.0.0.5:7000"),
                ("TRIPROTOCOL_TCP_TIMEOUT_SECS", " 25 "),
            ]))
            .unwrap();

        assert_eq!(config.address_for(Protocol::Binary), "10.0.0.5:7000");
        assert_eq!(config.address_for(Protocol::Json), "127.0.0.1:8081");
        assert_eq!(config.tcp_timeout_secs, 25);
    }

    #[test]
    fn test_env_timeout_must_be_numeric() {
        let err = ClientConfig::default()
            .with_overrides(env(&[("TRIPROTOCOL_TCP_TIMEOUT_SECS", "ten")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ClientConfig {
            tcp_timeout_secs: 0,
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_address_validation() {
        for bad in ["localhost", ":8080", "host:", "host:http", "host:70000", "host:0"] {
            let mut config = ClientConfig::default();
            config.servers.string = bad.to_string();
            assert!(config.validate().is_err(), "{bad} should be rejected");
        }

        let mut config = ClientConfig::default();
        config.servers.string = "[::1]:8080".to_string();
        config.validate().unwrap();
    }
}
