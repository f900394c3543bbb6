//! Polling record source
//!
//! Turns the backend's REST snapshot endpoint into a push-style change feed:
//! each poll is diffed against the previous snapshot per `deployment_id` and
//! only the changes are delivered. The first snapshot is always delivered,
//! even when empty, so subscribers get an initial view.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::errors::{StatusError, TransportError};
use crate::http::client::HttpClient;
use crate::utils::{calc_exp_backoff, CooldownOptions};
use crate::watch::source::{ChangeBatch, ChangeSink, RecordChange, RecordSource, SourceHandle};

/// Polling source options
#[derive(Debug, Clone)]
pub struct Options {
    /// Polling interval
    pub interval: Duration,

    /// Consecutive failures tolerated before the watch is degraded
    pub max_err_streak: u32,

    /// Backoff applied between failed polls
    pub cooldown: CooldownOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_err_streak: 5,
            cooldown: CooldownOptions::default(),
        }
    }
}

/// Record source that polls the backend deployments API
pub struct PollSource {
    http_client: Arc<HttpClient>,
    options: Options,
}

impl PollSource {
    pub fn new(http_client: Arc<HttpClient>, options: Options) -> Self {
        Self {
            http_client,
            options,
        }
    }
}

impl RecordSource for PollSource {
    /// Spawns the polling task; must be called from within a Tokio runtime
    fn open(
        &self,
        agent_id: &str,
        sink: Arc<dyn ChangeSink>,
    ) -> Result<Box<dyn SourceHandle>, StatusError> {
        let (stop_tx, stop_rx) = oneshot::channel();

        let http_client = self.http_client.clone();
        let options = self.options.clone();
        let agent_id = agent_id.to_string();

        tokio::spawn(async move {
            poll_loop(http_client, options, agent_id, sink, stop_rx).await;
        });

        Ok(Box::new(PollHandle {
            stop_tx: Some(stop_tx),
        }))
    }
}

struct PollHandle {
    stop_tx: Option<oneshot::Sender<()>>,
}

impl SourceHandle for PollHandle {
    fn close(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}

async fn poll_loop(
    http_client: Arc<HttpClient>,
    options: Options,
    agent_id: String,
    sink: Arc<dyn ChangeSink>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut known: HashMap<String, serde_json::Value> = HashMap::new();
    let mut first_snapshot = true;
    let mut err_streak: u32 = 0;

    loop {
        match http_client.list_agent_deployments(&agent_id).await {
            Ok(documents) => {
                err_streak = 0;
                let batch = diff_documents(&mut known, documents);
                if first_snapshot || !batch.is_empty() {
                    debug!(
                        "Delivering {} record change(s) for agent {}",
                        batch.changes.len(),
                        agent_id
                    );
                    sink.deliver(batch);
                }
                first_snapshot = false;
            }
            Err(e) => {
                err_streak += 1;
                warn!(
                    "Deployment poll failed for agent {} (attempt {}): {}",
                    agent_id, err_streak, e
                );
                if err_streak >= options.max_err_streak {
                    sink.transport_error(TransportError::new(e.to_string()));
                    return;
                }
            }
        }

        let wait = if err_streak > 0 {
            calc_exp_backoff(&options.cooldown, err_streak)
        } else {
            options.interval
        };

        tokio::select! {
            _ = &mut stop_rx => {
                debug!("Poll watch closed for agent {}", agent_id);
                return;
            }
            _ = tokio::time::sleep(wait) => {
                // Continue with next poll
            }
        }
    }
}

/// Diff a fresh snapshot against the previous one, updating `known` in place
fn diff_documents(
    known: &mut HashMap<String, serde_json::Value>,
    fetched: Vec<serde_json::Value>,
) -> ChangeBatch {
    let mut changes = Vec::new();
    let mut seen: HashSet<String> = HashSet::with_capacity(fetched.len());

    for doc in fetched {
        let Some(deployment_id) = doc.get("deployment_id").and_then(|v| v.as_str()) else {
            // Cannot be diffed without a key; the adapter reports malformed
            // records that do carry one
            warn!("Ignoring deployment document without deployment_id");
            continue;
        };
        let deployment_id = deployment_id.to_string();
        seen.insert(deployment_id.clone());

        if known.get(&deployment_id) != Some(&doc) {
            known.insert(deployment_id, doc.clone());
            changes.push(RecordChange::Upsert(doc));
        }
    }

    let gone: Vec<String> = known
        .keys()
        .filter(|id| !seen.contains(*id))
        .cloned()
        .collect();
    for deployment_id in gone {
        known.remove(&deployment_id);
        changes.push(RecordChange::Remove(deployment_id));
    }

    ChangeBatch { changes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, status: &str) -> serde_json::Value {
        json!({
            "deployment_id": id,
            "agent_id": "agent-1",
            "status": status,
            "updated_at": "2024-01-01T00:00:00Z",
        })
    }

    #[test]
    fn test_diff_reports_new_and_changed_documents() {
        let mut known = HashMap::new();

        let batch = diff_documents(&mut known, vec![doc("d-1", "queued")]);
        assert_eq!(batch.changes.len(), 1);

        // Unchanged snapshot produces an empty batch
        let batch = diff_documents(&mut known, vec![doc("d-1", "queued")]);
        assert!(batch.is_empty());

        // Status change produces one upsert
        let batch = diff_documents(&mut known, vec![doc("d-1", "deploying")]);
        assert_eq!(batch.changes.len(), 1);
        assert!(matches!(&batch.changes[0], RecordChange::Upsert(_)));
    }

    #[test]
    fn test_diff_reports_removed_documents() {
        let mut known = HashMap::new();
        diff_documents(&mut known, vec![doc("d-1", "queued"), doc("d-2", "queued")]);

        let batch = diff_documents(&mut known, vec![doc("d-2", "queued")]);
        assert_eq!(batch.changes.len(), 1);
        assert!(matches!(
            &batch.changes[0],
            RecordChange::Remove(id) if id == "d-1"
        ));
        assert!(!known.contains_key("d-1"));
    }
}
