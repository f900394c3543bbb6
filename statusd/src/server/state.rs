//! Server state

use std::sync::Arc;

use crate::app::state::ActivityTracker;
use crate::cache::views::ViewRegistry;

/// Shared state for HTTP handlers
pub struct ServerState {
    /// Latest derived view per tracked agent
    pub views: Arc<ViewRegistry>,

    /// Activity tracker for idle timeout detection
    pub activity_tracker: Arc<ActivityTracker>,
}

impl ServerState {
    pub fn new(views: Arc<ViewRegistry>, activity_tracker: Arc<ActivityTracker>) -> Self {
        Self {
            views,
            activity_tracker,
        }
    }
}
