//! Record source abstraction
//!
//! The adapter depends only on "subscribe to records matching an agent,
//! deliver add/modify/remove batches", not on any particular store client.
//! Implementations exist over an in-memory registry ([`crate::watch::memory`])
//! and a polling REST diff ([`crate::watch::poll`]); a database change-stream
//! or websocket feed slots in the same way.

use std::sync::Arc;

use crate::errors::{StatusError, TransportError};

/// One change to a deployment record document
#[derive(Debug, Clone)]
pub enum RecordChange {
    /// A record was added or modified; carries the full document
    Upsert(serde_json::Value),

    /// A record was removed, identified by its deployment ID
    Remove(String),
}

/// A batch of record changes delivered together
#[derive(Debug, Clone, Default)]
pub struct ChangeBatch {
    pub changes: Vec<RecordChange>,
}

impl ChangeBatch {
    pub fn upserts(documents: Vec<serde_json::Value>) -> Self {
        Self {
            changes: documents.into_iter().map(RecordChange::Upsert).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Receiver side of a record subscription
pub trait ChangeSink: Send + Sync {
    /// Deliver one change batch; invoked on the source's delivery task
    fn deliver(&self, batch: ChangeBatch);

    /// Report a transport failure; the sink enforces at-most-once surfacing
    fn transport_error(&self, error: TransportError);
}

/// A push-capable store of deployment records
pub trait RecordSource: Send + Sync {
    /// Begin delivering change batches for `agent_id` to `sink` until the
    /// returned handle is closed.
    fn open(
        &self,
        agent_id: &str,
        sink: Arc<dyn ChangeSink>,
    ) -> Result<Box<dyn SourceHandle>, StatusError>;
}

/// Handle to an open source registration
pub trait SourceHandle: Send {
    /// Stop delivery and release underlying resources; idempotent
    fn close(&mut self);
}
