//! Deployment record models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::MalformedRecordError;

/// Lifecycle status of a single deployment attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Accepted, waiting for the pipeline to pick it up
    Queued,

    /// Pipeline is preparing the build environment
    Initializing,

    /// Agent code is being generated
    GeneratingCode,

    /// Container image is being built
    BuildingImage,

    /// Image is being rolled out to the runtime
    Deploying,

    /// Pipeline finished and the service is reachable
    Completed,

    /// Service is live (legacy pipelines report this instead of completed)
    Deployed,

    /// Deployment failed
    Failed,

    /// Deployment was cancelled before completion
    Cancelled,
}

impl DeploymentStatus {
    /// True for statuses that mean the agent ended up running
    pub fn is_success(&self) -> bool {
        matches!(self, DeploymentStatus::Completed | DeploymentStatus::Deployed)
    }

    /// True while the pipeline is still working on this attempt
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            DeploymentStatus::Queued
                | DeploymentStatus::Initializing
                | DeploymentStatus::GeneratingCode
                | DeploymentStatus::BuildingImage
                | DeploymentStatus::Deploying
        )
    }

    /// True once the attempt can no longer change state
    pub fn is_terminal(&self) -> bool {
        !self.is_in_flight()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Queued => "queued",
            DeploymentStatus::Initializing => "initializing",
            DeploymentStatus::GeneratingCode => "generating_code",
            DeploymentStatus::BuildingImage => "building_image",
            DeploymentStatus::Deploying => "deploying",
            DeploymentStatus::Completed => "completed",
            DeploymentStatus::Deployed => "deployed",
            DeploymentStatus::Failed => "failed",
            DeploymentStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for DeploymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(DeploymentStatus::Queued),
            "initializing" => Ok(DeploymentStatus::Initializing),
            "generating_code" => Ok(DeploymentStatus::GeneratingCode),
            "building_image" => Ok(DeploymentStatus::BuildingImage),
            "deploying" => Ok(DeploymentStatus::Deploying),
            "completed" => Ok(DeploymentStatus::Completed),
            "deployed" => Ok(DeploymentStatus::Deployed),
            "failed" => Ok(DeploymentStatus::Failed),
            "cancelled" => Ok(DeploymentStatus::Cancelled),
            _ => Err(format!("Invalid deployment status: {}", s)),
        }
    }
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One deployment attempt for an agent
///
/// Records are append-only history; the pipeline mutates `status` and
/// `updated_at` as the attempt progresses, and never deletes records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// Unique deployment ID (document key)
    pub deployment_id: String,

    /// Owning agent; many records per agent
    pub agent_id: String,

    /// Current status of this attempt
    pub status: DeploymentStatus,

    /// When the attempt was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Last mutation time; monotonically non-decreasing per record
    pub updated_at: DateTime<Utc>,

    /// Service URL, present only on terminal success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,

    /// Error message, present only on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Descriptive deployment region
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl DeploymentRecord {
    /// Parse a raw store document into a validated record.
    ///
    /// A document missing `deployment_id`, `agent_id`, `status`, or
    /// `updated_at`, or carrying an unparseable status or timestamp, is
    /// malformed and must be skipped by callers.
    pub fn from_document(doc: &serde_json::Value) -> Result<Self, MalformedRecordError> {
        let obj = doc.as_object().ok_or(MalformedRecordError::NotAnObject)?;

        let deployment_id = obj
            .get("deployment_id")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let field = |name: &'static str| MalformedRecordError::MissingField {
            deployment_id: deployment_id.clone(),
            field: name,
        };

        let deployment_id_val = deployment_id.clone().ok_or_else(|| field("deployment_id"))?;

        let agent_id = obj
            .get("agent_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| field("agent_id"))?
            .to_string();

        let status_str = obj
            .get("status")
            .and_then(|v| v.as_str())
            .ok_or_else(|| field("status"))?;
        let status = status_str
            .parse::<DeploymentStatus>()
            .map_err(|_| MalformedRecordError::UnknownStatus {
                deployment_id: deployment_id.clone(),
                value: status_str.to_string(),
            })?;

        let updated_at = parse_timestamp(obj.get("updated_at"), "updated_at", &deployment_id)?
            .ok_or_else(|| field("updated_at"))?;

        // created_at is tolerated when absent; a bad value is still malformed
        let created_at = parse_timestamp(obj.get("created_at"), "created_at", &deployment_id)?;

        Ok(Self {
            deployment_id: deployment_id_val,
            agent_id,
            status,
            created_at,
            updated_at,
            service_url: obj
                .get("service_url")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            error_message: obj
                .get("error_message")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            region: obj.get("region").and_then(|v| v.as_str()).map(str::to_string),
        })
    }
}

fn parse_timestamp(
    value: Option<&serde_json::Value>,
    field: &'static str,
    deployment_id: &Option<String>,
) -> Result<Option<DateTime<Utc>>, MalformedRecordError> {
    let Some(value) = value else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }

    let raw = value
        .as_str()
        .ok_or_else(|| MalformedRecordError::InvalidTimestamp {
            deployment_id: deployment_id.clone(),
            field,
        })?;

    DateTime::parse_from_rfc3339(raw)
        .map(|ts| Some(ts.with_timezone(&Utc)))
        .map_err(|_| MalformedRecordError::InvalidTimestamp {
            deployment_id: deployment_id.clone(),
            field,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_valid_document() {
        let doc = json!({
            "deployment_id": "dep-1",
            "agent_id": "agent-1",
            "status": "deployed",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:05:00Z",
            "service_url": "https://svc.example",
            "region": "us-central1",
        });

        let record = DeploymentRecord::from_document(&doc).unwrap();
        assert_eq!(record.deployment_id, "dep-1");
        assert_eq!(record.status, DeploymentStatus::Deployed);
        assert!(record.status.is_success());
        assert_eq!(record.service_url.as_deref(), Some("https://svc.example"));
    }

    #[test]
    fn test_parse_missing_agent_id() {
        let doc = json!({
            "deployment_id": "dep-1",
            "status": "queued",
            "updated_at": "2024-01-01T00:00:00Z",
        });

        let err = DeploymentRecord::from_document(&doc).unwrap_err();
        assert_eq!(
            err,
            MalformedRecordError::MissingField {
                deployment_id: Some("dep-1".to_string()),
                field: "agent_id",
            }
        );
    }

    #[test]
    fn test_parse_unknown_status() {
        let doc = json!({
            "deployment_id": "dep-1",
            "agent_id": "agent-1",
            "status": "exploded",
            "updated_at": "2024-01-01T00:00:00Z",
        });

        let err = DeploymentRecord::from_document(&doc).unwrap_err();
        assert!(matches!(err, MalformedRecordError::UnknownStatus { .. }));
    }

    #[test]
    fn test_status_classification() {
        assert!(DeploymentStatus::Queued.is_in_flight());
        assert!(DeploymentStatus::BuildingImage.is_in_flight());
        assert!(!DeploymentStatus::Failed.is_in_flight());
        assert!(DeploymentStatus::Failed.is_terminal());
        assert!(DeploymentStatus::Cancelled.is_terminal());
        assert!(!DeploymentStatus::Cancelled.is_success());
        assert!(DeploymentStatus::Completed.is_success());
    }

    #[test]
    fn test_status_round_trip_names() {
        for status in [
            DeploymentStatus::Queued,
            DeploymentStatus::GeneratingCode,
            DeploymentStatus::Deployed,
        ] {
            assert_eq!(status.as_str().parse::<DeploymentStatus>(), Ok(status));
        }
    }
}
