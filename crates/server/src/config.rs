//! Server configuration
//!
//! Loaded from JSON; every field has a default so a partial file (or `{}`)
//! is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Pipe server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Logical endpoint name shared by the server and every client
    #[serde(default = "default_pipe_name")]
    pub pipe_name: String,

    /// Directory holding the Unix socket (defaults to the OS temp dir).
    /// Ignored on Windows, where the name maps to `\\.\pipe\<pipe_name>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_dir: Option<PathBuf>,

    /// Largest accepted frame body in bytes
    #[serde(default = "default_max_frame_length")]
    pub max_frame_length: usize,

    /// Per-subscriber event queue depth before a slow observer starts lagging
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Back-off between failed accept attempts
    #[serde(default = "default_accept_retry_delay_ms")]
    pub accept_retry_delay_ms: u64,
}

fn default_pipe_name() -> String {
    "TradingBridge".to_string()
}

fn default_max_frame_length() -> usize {
    1024 * 1024
}

fn default_event_capacity() -> usize {
    1024
}

fn default_accept_retry_delay_ms() -> u64 {
    100
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            pipe_name: default_pipe_name(),
            socket_dir: None,
            max_frame_length: default_max_frame_length(),
            event_capacity: default_event_capacity(),
            accept_retry_delay_ms: default_accept_retry_delay_ms(),
        }
    }
}

impl ServerConfig {
    /// Default configuration under a different pipe name
    pub fn with_pipe_name(pipe_name: impl Into<String>) -> Self {
        Self {
            pipe_name: pipe_name.into(),
            ..Default::default()
        }
    }

    /// Place the socket in `dir`
    pub fn socket_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.socket_dir = Some(dir.into());
        self
    }

    pub fn accept_retry_delay(&self) -> Duration {
        Duration::from_millis(self.accept_retry_delay_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipe_name.trim().is_empty() {
            return Err(ConfigError::Invalid("pipe_name is empty".to_string()));
        }
        if self.pipe_name.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "pipe_name '{}' must not contain path separators",
                self.pipe_name
            )));
        }
        if self.max_frame_length == 0 {
            return Err(ConfigError::Invalid(
                "max_frame_length must be positive".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid(
                "event_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load server configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServerConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Load configuration from a JSON string
pub fn load_config_from_str(json: &str) -> Result<ServerConfig, ConfigError> {
    let config: ServerConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Load the default embedded configuration
pub fn load_default_config() -> Result<ServerConfig, ConfigError> {
    let default_config = include_str!("server_config.json");
    load_config_from_str(default_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_default_config() {
        let config = load_default_config().unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.pipe_name, "TradingBridge");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = load_config_from_str(r#"{"pipe_name": "DeskBridge"}"#).unwrap();
        assert_eq!(config.pipe_name, "DeskBridge");
        assert_eq!(config.max_frame_length, 1024 * 1024);
        assert_eq!(config.accept_retry_delay(), Duration::from_millis(100));

        let empty = load_config_from_str("{}").unwrap();
        assert_eq!(empty, ServerConfig::default());
    }

    #[test]
    fn test_invalid_configs_rejected() {
        assert!(matches!(
            load_config_from_str(r#"{"pipe_name": ""}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            load_config_from_str(r#"{"pipe_name": "a/b"}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            load_config_from_str(r#"{"max_frame_length": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            load_config_from_str("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.json");
        std::fs::write(&path, r#"{"pipe_name": "FileBridge", "event_capacity": 16}"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.pipe_name, "FileBridge");
        assert_eq!(config.event_capacity, 16);

        assert!(matches!(
            load_config(dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
