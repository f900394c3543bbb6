//! Deployments API client

use serde::Deserialize;

use crate::errors::StatusError;
use crate::http::client::HttpClient;

/// List of deployment documents response
///
/// Documents are kept as raw JSON here; validation happens in the reducer
/// path so that one malformed record cannot fail the whole listing.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentListResponse {
    pub deployments: Vec<serde_json::Value>,
}

impl HttpClient {
    /// Get the full deployment history for an agent
    pub async fn list_agent_deployments(
        &self,
        agent_id: &str,
    ) -> Result<Vec<serde_json::Value>, StatusError> {
        let path = format!("/api/agents/{}/deployments", agent_id);
        let response: DeploymentListResponse = self.get(&path).await?;
        Ok(response.deployments)
    }
}
