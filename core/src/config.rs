//! Client configuration.
//!
//! Loadable from TOML; every field has a default so an empty document is a
//! valid configuration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings applied to the `reqwest::Client` a delegate builds for itself.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// TCP/TLS connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Maximum idle time between reads of a response, in seconds.
    pub read_timeout_secs: u64,

    /// Optional deadline for a whole call, in seconds.
    pub call_timeout_secs: Option<u64>,

    pub user_agent: String,

    /// Install a `LoggingInterceptor` ahead of caller interceptors.
    pub log_requests: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 300,
            read_timeout_secs: 300,
            call_timeout_secs: None,
            user_agent: concat!("netkit/", env!("CARGO_PKG_VERSION")).to_string(),
            log_requests: true,
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid("connect_timeout_secs must be > 0".into()));
        }
        if self.read_timeout_secs == 0 {
            return Err(ConfigError::Invalid("read_timeout_secs must be > 0".into()));
        }
        if self.call_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid("call_timeout_secs must be > 0".into()));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_secs.map(Duration::from_secs)
    }
}
