//! Derived deployment view

use serde::{Deserialize, Serialize};

use crate::models::deployment::DeploymentRecord;

/// Deployment state derived from an agent's full record history.
///
/// Never persisted; recomputed from the record set on every read so that all
/// consumers agree on what "deployed" means.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentDeploymentView {
    /// True iff at least one record reached a successful terminal status,
    /// regardless of later failed attempts
    pub is_deployed: bool,

    /// Most recently updated successful record, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_deployment: Option<DeploymentRecord>,

    /// Most recently updated record overall, any status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_deployment: Option<DeploymentRecord>,

    /// True iff the latest record is still in flight
    pub is_deploying: bool,
}

impl AgentDeploymentView {
    /// Service URL of the active deployment, if the agent is deployed
    pub fn service_url(&self) -> Option<&str> {
        self.active_deployment
            .as_ref()
            .and_then(|record| record.service_url.as_deref())
    }
}
