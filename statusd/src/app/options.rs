//! Application configuration options

use std::time::Duration;

use crate::watch::poll;
use crate::workers::reconciler;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Backend API base URL
    pub backend_base_url: String,

    /// Optional API key for the backend
    pub api_key: Option<String>,

    /// Agents whose deployment state this daemon tracks
    pub agent_ids: Vec<String>,

    /// Enable local HTTP server
    pub enable_socket_server: bool,

    /// Enable reconciler worker
    pub enable_reconciler: bool,

    /// Server configuration
    pub server: ServerOptions,

    /// Polling record source options
    pub poll: poll::Options,

    /// Reconciler worker options
    pub reconciler: reconciler::Options,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            backend_base_url: "https://api.alchemist.build/v1".to_string(),
            api_key: None,
            agent_ids: Vec::new(),
            enable_socket_server: true,
            enable_reconciler: true,
            server: ServerOptions::default(),
            poll: poll::Options::default(),
            reconciler: reconciler::Options::default(),
        }
    }
}

/// Lifecycle options for the daemon
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Whether the daemon runs persistently (as a service)
    pub is_persistent: bool,

    /// Idle timeout before shutdown (non-persistent mode)
    pub idle_timeout: Duration,

    /// Interval to check for idle timeout
    pub idle_timeout_poll_interval: Duration,

    /// Maximum runtime before shutdown (non-persistent mode)
    pub max_runtime: Duration,

    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            is_persistent: true,
            idle_timeout: Duration::from_secs(300), // 5 minutes
            idle_timeout_poll_interval: Duration::from_secs(10),
            max_runtime: Duration::from_secs(3600), // 1 hour
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8090,
        }
    }
}
