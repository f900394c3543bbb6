//! Deployment view registry

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::models::view::AgentDeploymentView;

/// Registry entry for one tracked agent
#[derive(Debug, Clone)]
pub struct ViewEntry {
    pub view: AgentDeploymentView,
    pub published_at: DateTime<Utc>,
}

/// Most recent derived view per tracked agent.
///
/// Fed by the reconciler worker, read by the HTTP server. Views are stored
/// per agent with no shared mutable state between entries.
#[derive(Default)]
pub struct ViewRegistry {
    entries: RwLock<HashMap<String, ViewEntry>>,
}

impl ViewRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the latest view for an agent
    pub fn get(&self, agent_id: &str) -> Option<ViewEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(agent_id).cloned()
    }

    /// Publish a freshly reduced view for an agent
    pub fn publish(&self, agent_id: &str, view: AgentDeploymentView) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            agent_id.to_string(),
            ViewEntry {
                view,
                published_at: Utc::now(),
            },
        );
    }

    /// Drop an agent's view
    pub fn remove(&self, agent_id: &str) -> Option<ViewEntry> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(agent_id)
    }

    /// Get all tracked agent IDs
    pub fn agent_ids(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.keys().cloned().collect()
    }

    /// Number of tracked agents with a published view
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
