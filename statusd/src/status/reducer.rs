//! Status reducer
//!
//! Pure derivation of an [`AgentDeploymentView`] from the set of deployment
//! records belonging to one agent. Every consumer of deployment state goes
//! through this single function so that the dashboard, the feature gate, and
//! the HTTP API can never disagree about whether an agent is deployed.

use std::cmp::Ordering;

use crate::errors::MalformedRecordError;
use crate::models::deployment::DeploymentRecord;
use crate::models::view::AgentDeploymentView;

/// Optional sink for records the reducer had to skip
pub type DiagnosticsFn = dyn Fn(MalformedRecordError) + Send + Sync;

/// Reduce an agent's deployment records to a single derived view.
///
/// Input order does not matter; records are ranked internally by
/// `updated_at` descending, ties broken by `created_at` descending (missing
/// `created_at` ranks oldest), then `deployment_id` ascending so the result
/// is fully deterministic.
///
/// `is_deployed` is computed over the whole record set, not just the latest
/// record: a later failed redeploy must not retract an earlier success
/// (last successful revision wins). `is_deploying` in contrast looks only at
/// the single most recent record.
pub fn reduce(records: &[DeploymentRecord]) -> AgentDeploymentView {
    let mut ranked: Vec<&DeploymentRecord> = records.iter().collect();
    ranked.sort_by(|a, b| compare_recency(a, b));

    let latest_deployment = ranked.first().map(|record| (*record).clone());
    let active_deployment = ranked
        .iter()
        .find(|record| record.status.is_success())
        .map(|record| (*record).clone());

    let is_deployed = active_deployment.is_some();
    let is_deploying = latest_deployment
        .as_ref()
        .map(|record| record.status.is_in_flight())
        .unwrap_or(false);

    AgentDeploymentView {
        is_deployed,
        active_deployment,
        latest_deployment,
        is_deploying,
    }
}

/// Reduce raw store documents, skipping malformed ones.
///
/// Each skipped document is reported through `diagnostics` when provided;
/// one corrupt record never takes down the view computation for an agent.
pub fn reduce_documents(
    documents: &[serde_json::Value],
    diagnostics: Option<&DiagnosticsFn>,
) -> AgentDeploymentView {
    let records: Vec<DeploymentRecord> = documents
        .iter()
        .filter_map(|doc| match DeploymentRecord::from_document(doc) {
            Ok(record) => Some(record),
            Err(err) => {
                if let Some(report) = diagnostics {
                    report(err);
                }
                None
            }
        })
        .collect();

    reduce(&records)
}

/// Newest-first ordering: `updated_at` desc, `created_at` desc, id asc
fn compare_recency(a: &DeploymentRecord, b: &DeploymentRecord) -> Ordering {
    b.updated_at
        .cmp(&a.updated_at)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.deployment_id.cmp(&b.deployment_id))
}
