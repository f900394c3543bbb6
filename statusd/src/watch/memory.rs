//! In-memory record source
//!
//! Backs local development and tests: batches handed to [`MemorySource::publish`]
//! are delivered synchronously to every open sink for that agent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::errors::{StatusError, TransportError};
use crate::watch::source::{ChangeBatch, ChangeSink, RecordSource, SourceHandle};

type SinkTable = Mutex<HashMap<String, Vec<SinkEntry>>>;

struct SinkEntry {
    id: u64,
    sink: Arc<dyn ChangeSink>,
}

/// Record source over an in-process registry of sinks
#[derive(Default)]
pub struct MemorySource {
    sinks: Arc<SinkTable>,
    next_id: AtomicU64,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a change batch to every open sink for `agent_id`
    pub fn publish(&self, agent_id: &str, batch: ChangeBatch) {
        // Snapshot the sinks before delivering so a callback that closes its
        // own registration cannot deadlock against the table lock.
        let targets = self.snapshot(agent_id);
        for sink in targets {
            sink.deliver(batch.clone());
        }
    }

    /// Inject a transport failure into every open sink for `agent_id`
    pub fn fail(&self, agent_id: &str, error: TransportError) {
        let targets = self.snapshot(agent_id);
        for sink in targets {
            sink.transport_error(error.clone());
        }
    }

    /// Number of open sinks for `agent_id`
    pub fn sink_count(&self, agent_id: &str) -> usize {
        let sinks = self.sinks.lock().unwrap_or_else(|e| e.into_inner());
        sinks.get(agent_id).map(Vec::len).unwrap_or(0)
    }

    fn snapshot(&self, agent_id: &str) -> Vec<Arc<dyn ChangeSink>> {
        let sinks = self.sinks.lock().unwrap_or_else(|e| e.into_inner());
        sinks
            .get(agent_id)
            .map(|entries| entries.iter().map(|entry| entry.sink.clone()).collect())
            .unwrap_or_default()
    }
}

impl RecordSource for MemorySource {
    fn open(
        &self,
        agent_id: &str,
        sink: Arc<dyn ChangeSink>,
    ) -> Result<Box<dyn SourceHandle>, StatusError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut sinks = self.sinks.lock().unwrap_or_else(|e| e.into_inner());
        sinks
            .entry(agent_id.to_string())
            .or_default()
            .push(SinkEntry { id, sink });

        Ok(Box::new(MemoryHandle {
            agent_id: agent_id.to_string(),
            id,
            sinks: Some(self.sinks.clone()),
        }))
    }
}

struct MemoryHandle {
    agent_id: String,
    id: u64,
    sinks: Option<Arc<SinkTable>>,
}

impl SourceHandle for MemoryHandle {
    fn close(&mut self) {
        let Some(table) = self.sinks.take() else {
            return;
        };

        let mut sinks = table.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entries) = sinks.get_mut(&self.agent_id) {
            entries.retain(|entry| entry.id != self.id);
            if entries.is_empty() {
                sinks.remove(&self.agent_id);
            }
        }
    }
}
