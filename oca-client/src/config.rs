//! Client configuration.
//!
//! Loaded from a YAML file, then overridden by environment variables and
//! finally by explicit values (CLI flags):
//!
//! ```yaml
//! endpoint: http://frontend:2633/RPC2
//! session: oneadmin:secret
//! request_timeout_secs: 30
//! log_level: info
//! log_format: json
//! ```

use oca_common::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{ClientError, Result};

/// Environment variable overriding [`ClientConfig::endpoint`].
pub const ENV_ENDPOINT: &str = "OCA_ENDPOINT";

/// Environment variable overriding [`ClientConfig::session`].
pub const ENV_SESSION: &str = "OCA_SESSION";

/// Default XML-RPC endpoint of a local front-end.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:2633/RPC2";

/// Control plane client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// XML-RPC endpoint URL
    pub endpoint: String,

    /// Session string, sent as the first argument of every call
    pub session: String,

    /// Whole request timeout in seconds
    pub request_timeout_secs: u64,

    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log format (json, pretty)
    pub log_format: LogFormat,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            session: String::new(),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;

        let config: ClientConfig = serde_yaml::from_str(&content).map_err(|e| {
            ClientError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Defaults overridden by the environment.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `OCA_ENDPOINT` and `OCA_SESSION` when set.
    pub fn with_env_overrides(self) -> Self {
        let endpoint = std::env::var(ENV_ENDPOINT).ok();
        let session = std::env::var(ENV_SESSION).ok();
        if endpoint.is_some() || session.is_some() {
            debug!("Applying environment overrides");
        }
        self.with_overrides(endpoint.as_deref(), session.as_deref())
    }

    /// Apply explicit overrides.
    pub fn with_overrides(mut self, endpoint: Option<&str>, session: Option<&str>) -> Self {
        if let Some(endpoint) = endpoint {
            self.endpoint = endpoint.to_string();
        }
        if let Some(session) = session {
            self.session = session.to_string();
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(ClientError::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.connect_timeout_secs == 0 {
            return Err(ClientError::Config(
                "connect_timeout_secs must be greater than 0".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ClientError::Config(format!(
                "log_level must be one of: {:?}",
                valid_levels
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ClientConfig::default();

        config.endpoint = "frontend:2633".to_string();
        assert!(matches!(config.validate(), Err(ClientError::Config(_))));
        config.endpoint = "https://frontend/RPC2".to_string();

        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());
        config.request_timeout_secs = 5;

        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
        config.log_level = "DEBUG".to_string();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "endpoint: http://one:2633/RPC2").unwrap();
        writeln!(file, "session: oneadmin:pw").unwrap();
        writeln!(file, "log_format: json").unwrap();

        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.endpoint, "http://one:2633/RPC2");
        assert_eq!(config.session, "oneadmin:pw");
        assert_eq!(config.log_format, LogFormat::Json);
        // Missing fields fall back to defaults.
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn test_load_errors() {
        assert!(matches!(
            ClientConfig::load("/nonexistent/oca.yaml"),
            Err(ClientError::Config(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "request_timeout_secs: soon").unwrap();
        assert!(ClientConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::default().with_overrides(Some("http://b/RPC2"), None);
        assert_eq!(config.endpoint, "http://b/RPC2");
        assert_eq!(config.session, "");
    }
}
