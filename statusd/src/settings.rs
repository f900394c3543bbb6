//! Settings file management

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::StatusError;
use crate::logs::LogLevel;

/// Daemon settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Backend configuration
    #[serde(default)]
    pub backend: BackendSettings,

    /// Agents whose deployment state is tracked
    #[serde(default)]
    pub agents: Vec<String>,

    /// Whether the daemon runs persistently
    #[serde(default = "default_true")]
    pub is_persistent: bool,

    /// Enable local HTTP server
    #[serde(default = "default_true")]
    pub enable_socket_server: bool,

    /// Enable reconciler worker
    #[serde(default = "default_true")]
    pub enable_reconciler: bool,

    /// Polling interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Local HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            backend: BackendSettings::default(),
            agents: Vec::new(),
            is_persistent: true,
            enable_socket_server: true,
            enable_reconciler: true,
            poll_interval_secs: 10,
            server: ServerSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    pub async fn load(path: &Path) -> Result<Self, StatusError> {
        let raw = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Backend API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL for the backend API
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Optional API key for the backend
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_backend_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            api_key: None,
        }
    }
}

/// Local HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_server_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8090
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults_from_empty_json() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert!(settings.is_persistent);
        assert!(settings.enable_socket_server);
        assert!(settings.agents.is_empty());
        assert_eq!(settings.poll_interval_secs, 10);
        assert_eq!(settings.server.port, 8090);
    }

    #[test]
    fn test_settings_parse_agents_and_backend() {
        let raw = r#"{
            "log_level": "debug",
            "backend": {"base_url": "https://api.alchemist.build/v1", "api_key": "sk-test"},
            "agents": ["agent-1", "agent-2"],
            "is_persistent": false
        }"#;

        let settings: Settings = serde_json::from_str(raw).unwrap();
        assert_eq!(settings.log_level, LogLevel::Debug);
        assert_eq!(settings.agents.len(), 2);
        assert_eq!(settings.backend.api_key.as_deref(), Some("sk-test"));
        assert!(!settings.is_persistent);
    }
}
