//! Application state management

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::cache::views::ViewRegistry;
use crate::errors::StatusError;
use crate::http::client::HttpClient;
use crate::watch::adapter::DeploymentWatcher;
use crate::watch::poll::PollSource;

/// Activity tracker for idle timeout detection
pub struct ActivityTracker {
    last_touched: AtomicU64,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self {
            last_touched: AtomicU64::new(now_epoch_secs()),
        }
    }

    pub fn touch(&self) {
        self.last_touched.store(now_epoch_secs(), Ordering::SeqCst);
    }

    pub fn last_touched(&self) -> u64 {
        self.last_touched.load(Ordering::SeqCst)
    }
}

impl Default for ActivityTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn now_epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Main application state
pub struct AppState {
    /// HTTP client for backend communication
    pub http_client: Arc<HttpClient>,

    /// Subscription factory over the polling record source
    pub watcher: Arc<DeploymentWatcher>,

    /// Latest derived view per tracked agent
    pub views: Arc<ViewRegistry>,

    /// Activity tracker
    pub activity_tracker: Arc<ActivityTracker>,
}

impl AppState {
    /// Initialize application state
    pub fn init(options: &AppOptions) -> Result<Self, StatusError> {
        info!("Initializing application state...");

        let http_client = Arc::new(HttpClient::new(
            &options.backend_base_url,
            options.api_key.clone(),
        )?);

        let source = Arc::new(PollSource::new(http_client.clone(), options.poll.clone()));
        let watcher = Arc::new(DeploymentWatcher::new(source));

        Ok(Self {
            http_client,
            watcher,
            views: Arc::new(ViewRegistry::new()),
            activity_tracker: Arc::new(ActivityTracker::new()),
        })
    }

    /// Shutdown application state
    pub fn shutdown(&self) {
        info!("Shutting down application state...");
    }
}
