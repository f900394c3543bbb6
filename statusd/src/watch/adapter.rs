//! Live subscription adapter
//!
//! Bridges a push-based record source into repeated status-reducer
//! invocations. Every change batch triggers a full recomputation over the
//! deduplicated record table (never an incremental patch), so out-of-order
//! delivery of individual records is self-correcting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::errors::{StatusError, TransportError};
use crate::models::deployment::DeploymentRecord;
use crate::models::view::AgentDeploymentView;
use crate::status::reducer::{reduce, DiagnosticsFn};
use crate::utils::generate_uuid;
use crate::watch::source::{ChangeBatch, ChangeSink, RecordChange, RecordSource, SourceHandle};

type UpdateFn = dyn FnMut(AgentDeploymentView) + Send;
type ErrorFn = dyn FnMut(TransportError) + Send;

/// Factory for live deployment-view subscriptions over a record source
pub struct DeploymentWatcher {
    source: Arc<dyn RecordSource>,
    diagnostics: Option<Arc<DiagnosticsFn>>,
}

impl DeploymentWatcher {
    /// Create a watcher over a record source
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self {
            source,
            diagnostics: None,
        }
    }

    /// Attach a hook that observes every skipped malformed record
    pub fn with_diagnostics(
        mut self,
        diagnostics: impl Fn(crate::errors::MalformedRecordError) + Send + Sync + 'static,
    ) -> Self {
        self.diagnostics = Some(Arc::new(diagnostics));
        self
    }

    /// Subscribe to the deployment view of one agent.
    ///
    /// `on_update` receives a freshly reduced view after every change batch;
    /// `on_error` is invoked at most once, after which the subscription is
    /// degraded but not terminated. The returned handle unsubscribes on drop.
    pub fn subscribe(
        &self,
        agent_id: &str,
        on_update: impl FnMut(AgentDeploymentView) + Send + 'static,
        on_error: impl FnMut(TransportError) + Send + 'static,
    ) -> Result<WatchHandle, StatusError> {
        let shared = Arc::new(WatchShared {
            subscription_id: generate_uuid(),
            agent_id: agent_id.to_string(),
            cancelled: AtomicBool::new(false),
            errored: AtomicBool::new(false),
            records: Mutex::new(HashMap::new()),
            on_update: Mutex::new(Box::new(on_update)),
            on_error: Mutex::new(Box::new(on_error)),
            diagnostics: self.diagnostics.clone(),
        });

        let source_handle = self.source.open(agent_id, shared.clone())?;
        debug!(
            "Subscribed to deployment records: agent={} subscription={}",
            agent_id, shared.subscription_id
        );

        Ok(WatchHandle {
            shared,
            source_handle: Mutex::new(Some(source_handle)),
        })
    }
}

/// Per-subscription state shared between the handle and the delivery path.
///
/// Nothing here is shared across subscriptions, so concurrent watches of the
/// same or different agents cannot leak state into each other.
struct WatchShared {
    subscription_id: String,
    agent_id: String,
    cancelled: AtomicBool,
    errored: AtomicBool,
    records: Mutex<HashMap<String, DeploymentRecord>>,
    on_update: Mutex<Box<UpdateFn>>,
    on_error: Mutex<Box<ErrorFn>>,
    diagnostics: Option<Arc<DiagnosticsFn>>,
}

impl WatchShared {
    /// Fold one change into the record table.
    ///
    /// Dedup rule: only the newest version of each `deployment_id` (by
    /// `updated_at`) survives; superseded duplicates are dropped before
    /// reduction. Malformed documents are reported and skipped, keeping any
    /// previously valid version of the same record.
    fn apply(&self, records: &mut HashMap<String, DeploymentRecord>, change: RecordChange) {
        match change {
            RecordChange::Upsert(doc) => {
                let record = match DeploymentRecord::from_document(&doc) {
                    Ok(record) => record,
                    Err(err) => {
                        warn!(
                            "Skipping malformed deployment record: agent={} error={}",
                            self.agent_id, err
                        );
                        if let Some(report) = self.diagnostics.as_deref() {
                            report(err);
                        }
                        return;
                    }
                };

                if record.agent_id != self.agent_id {
                    warn!(
                        "Dropping record for foreign agent: expected={} got={} deployment={}",
                        self.agent_id, record.agent_id, record.deployment_id
                    );
                    return;
                }

                match records.get(&record.deployment_id) {
                    Some(existing) if existing.updated_at > record.updated_at => {
                        // Superseded duplicate (retried or stale write)
                    }
                    _ => {
                        records.insert(record.deployment_id.clone(), record);
                    }
                }
            }
            RecordChange::Remove(deployment_id) => {
                records.remove(&deployment_id);
            }
        }
    }
}

impl ChangeSink for WatchShared {
    fn deliver(&self, batch: ChangeBatch) {
        if self.cancelled.load(Ordering::Acquire) {
            return;
        }

        // The callback lock serializes deliveries so views are observed in
        // the order the source emitted them.
        let mut on_update = self.on_update.lock().unwrap_or_else(|e| e.into_inner());
        if self.cancelled.load(Ordering::Acquire) {
            return;
        }

        let view = {
            let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
            for change in batch.changes {
                self.apply(&mut records, change);
            }
            let snapshot: Vec<DeploymentRecord> = records.values().cloned().collect();
            reduce(&snapshot)
        };

        (*on_update)(view);
    }

    fn transport_error(&self, error: TransportError) {
        if self.cancelled.load(Ordering::Acquire) {
            return;
        }
        // At most one error per subscription lifetime
        if self.errored.swap(true, Ordering::AcqRel) {
            return;
        }

        warn!(
            "Subscription degraded: agent={} subscription={} error={}",
            self.agent_id, self.subscription_id, error
        );

        let mut on_error = self.on_error.lock().unwrap_or_else(|e| e.into_inner());
        if self.cancelled.load(Ordering::Acquire) {
            return;
        }
        (*on_error)(error);
    }
}

/// Handle to one live subscription
pub struct WatchHandle {
    shared: Arc<WatchShared>,
    source_handle: Mutex<Option<Box<dyn SourceHandle>>>,
}

impl WatchHandle {
    pub fn agent_id(&self) -> &str {
        &self.shared.agent_id
    }

    pub fn subscription_id(&self) -> &str {
        &self.shared.subscription_id
    }

    /// False once `unsubscribe` has been called
    pub fn is_active(&self) -> bool {
        !self.shared.cancelled.load(Ordering::Acquire)
    }

    /// Stop all further callbacks and release the source registration.
    ///
    /// Idempotent, and safe to call from inside `on_update` or `on_error`:
    /// the cancelled flag is checked on the delivery path before every
    /// callback invocation, so no update follows the call that set it.
    pub fn unsubscribe(&self) {
        if self.shared.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }

        debug!(
            "Unsubscribed from deployment records: agent={} subscription={}",
            self.shared.agent_id, self.shared.subscription_id
        );

        let handle = {
            let mut slot = self.source_handle.lock().unwrap_or_else(|e| e.into_inner());
            slot.take()
        };
        if let Some(mut handle) = handle {
            handle.close();
        }

        let mut records = self.shared.records.lock().unwrap_or_else(|e| e.into_inner());
        records.clear();
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
