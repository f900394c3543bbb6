//! Live subscription adapter integration tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;
use statusd::errors::{MalformedRecordError, TransportError};
use statusd::models::view::AgentDeploymentView;
use statusd::watch::adapter::{DeploymentWatcher, WatchHandle};
use statusd::watch::memory::MemorySource;
use statusd::watch::source::{ChangeBatch, RecordChange};

fn doc(agent_id: &str, deployment_id: &str, status: &str, updated_at: &str) -> serde_json::Value {
    json!({
        "deployment_id": deployment_id,
        "agent_id": agent_id,
        "status": status,
        "created_at": updated_at,
        "updated_at": updated_at,
    })
}

fn view_sink() -> (
    Arc<Mutex<Vec<AgentDeploymentView>>>,
    impl FnMut(AgentDeploymentView) + Send + 'static,
) {
    let views: Arc<Mutex<Vec<AgentDeploymentView>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = views.clone();
    (views, move |view| sink.lock().unwrap().push(view))
}

#[test]
fn test_updates_flow_to_subscriber() {
    let source = Arc::new(MemorySource::new());
    let watcher = DeploymentWatcher::new(source.clone());

    let (views, on_update) = view_sink();
    let _handle = watcher.subscribe("agent-1", on_update, |_| {}).unwrap();

    source.publish(
        "agent-1",
        ChangeBatch::upserts(vec![doc("agent-1", "d-1", "deploying", "2024-01-01T00:00:00Z")]),
    );
    source.publish(
        "agent-1",
        ChangeBatch::upserts(vec![doc("agent-1", "d-1", "deployed", "2024-01-01T00:05:00Z")]),
    );

    let views = views.lock().unwrap();
    assert_eq!(views.len(), 2);
    assert!(!views[0].is_deployed);
    assert!(views[0].is_deploying);
    assert!(views[1].is_deployed);
    assert!(!views[1].is_deploying);
}

#[test]
fn test_duplicate_records_collapse_to_newest() {
    let source = Arc::new(MemorySource::new());
    let watcher = DeploymentWatcher::new(source.clone());

    let (views, on_update) = view_sink();
    let _handle = watcher.subscribe("agent-1", on_update, |_| {}).unwrap();

    // Two versions of d-1 in one batch, newest last
    source.publish(
        "agent-1",
        ChangeBatch::upserts(vec![
            doc("agent-1", "d-1", "queued", "2024-01-01T00:00:00Z"),
            doc("agent-1", "d-1", "deployed", "2024-01-01T00:10:00Z"),
        ]),
    );
    // And again with the stale version delivered after the newer one
    source.publish(
        "agent-1",
        ChangeBatch::upserts(vec![doc("agent-1", "d-1", "queued", "2024-01-01T00:00:00Z")]),
    );

    let views = views.lock().unwrap();
    assert_eq!(views.len(), 2);
    for view in views.iter() {
        assert!(view.is_deployed, "stale duplicate must not win");
        let latest = view.latest_deployment.as_ref().unwrap();
        assert_eq!(latest.deployment_id, "d-1");
        assert_eq!(latest.updated_at.to_rfc3339(), "2024-01-01T00:10:00+00:00");
    }
}

#[test]
fn test_remove_drops_record_from_view() {
    let source = Arc::new(MemorySource::new());
    let watcher = DeploymentWatcher::new(source.clone());

    let (views, on_update) = view_sink();
    let _handle = watcher.subscribe("agent-1", on_update, |_| {}).unwrap();

    source.publish(
        "agent-1",
        ChangeBatch::upserts(vec![doc("agent-1", "d-1", "deployed", "2024-01-01T00:00:00Z")]),
    );
    source.publish(
        "agent-1",
        ChangeBatch {
            changes: vec![RecordChange::Remove("d-1".to_string())],
        },
    );

    let views = views.lock().unwrap();
    assert!(views[0].is_deployed);
    assert!(!views[1].is_deployed);
    assert!(views[1].latest_deployment.is_none());
}

#[test]
fn test_unsubscribe_stops_updates_and_is_idempotent() {
    let source = Arc::new(MemorySource::new());
    let watcher = DeploymentWatcher::new(source.clone());

    let (views, on_update) = view_sink();
    let handle = watcher.subscribe("agent-1", on_update, |_| {}).unwrap();
    assert_eq!(source.sink_count("agent-1"), 1);

    source.publish(
        "agent-1",
        ChangeBatch::upserts(vec![doc("agent-1", "d-1", "deployed", "2024-01-01T00:00:00Z")]),
    );

    handle.unsubscribe();
    assert!(!handle.is_active());
    assert_eq!(source.sink_count("agent-1"), 0);

    source.publish(
        "agent-1",
        ChangeBatch::upserts(vec![doc("agent-1", "d-2", "failed", "2024-01-02T00:00:00Z")]),
    );

    // Second call is a no-op, not an error
    handle.unsubscribe();

    assert_eq!(views.lock().unwrap().len(), 1);
}

#[test]
fn test_unsubscribe_is_reentrant_safe() {
    let source = Arc::new(MemorySource::new());
    let watcher = DeploymentWatcher::new(source.clone());

    let slot: Arc<Mutex<Option<WatchHandle>>> = Arc::new(Mutex::new(None));
    let unsubscriber = slot.clone();
    let update_count = Arc::new(AtomicUsize::new(0));
    let counter = update_count.clone();

    let handle = watcher
        .subscribe(
            "agent-1",
            move |_view| {
                counter.fetch_add(1, Ordering::SeqCst);
                // Unsubscribe from inside the update callback
                if let Some(handle) = unsubscriber.lock().unwrap().take() {
                    handle.unsubscribe();
                }
            },
            |_| {},
        )
        .unwrap();
    *slot.lock().unwrap() = Some(handle);

    let batch =
        ChangeBatch::upserts(vec![doc("agent-1", "d-1", "queued", "2024-01-01T00:00:00Z")]);
    source.publish("agent-1", batch.clone());
    source.publish("agent-1", batch);

    assert_eq!(update_count.load(Ordering::SeqCst), 1);
    assert_eq!(source.sink_count("agent-1"), 0);
}

#[test]
fn test_transport_error_fires_at_most_once() {
    let source = Arc::new(MemorySource::new());
    let watcher = DeploymentWatcher::new(source.clone());

    let error_count = Arc::new(AtomicUsize::new(0));
    let counter = error_count.clone();

    let _handle = watcher
        .subscribe(
            "agent-1",
            |_| {},
            move |_error| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        )
        .unwrap();

    source.fail("agent-1", TransportError::new("connection lost"));
    source.fail("agent-1", TransportError::new("connection lost again"));

    assert_eq!(error_count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_degraded_subscription_still_receives_updates() {
    let source = Arc::new(MemorySource::new());
    let watcher = DeploymentWatcher::new(source.clone());

    let (views, on_update) = view_sink();
    let _handle = watcher.subscribe("agent-1", on_update, |_| {}).unwrap();

    source.fail("agent-1", TransportError::new("blip"));
    source.publish(
        "agent-1",
        ChangeBatch::upserts(vec![doc("agent-1", "d-1", "deployed", "2024-01-01T00:00:00Z")]),
    );

    // Degraded, not terminated: the caller decides whether to resubscribe
    assert_eq!(views.lock().unwrap().len(), 1);
}

#[test]
fn test_subscriptions_are_independent() {
    let source = Arc::new(MemorySource::new());
    let watcher = DeploymentWatcher::new(source.clone());

    let (first_views, first_update) = view_sink();
    let (second_views, second_update) = view_sink();
    let (other_views, other_update) = view_sink();

    let first = watcher.subscribe("agent-1", first_update, |_| {}).unwrap();
    let _second = watcher.subscribe("agent-1", second_update, |_| {}).unwrap();
    let _other = watcher.subscribe("agent-2", other_update, |_| {}).unwrap();

    let batch =
        ChangeBatch::upserts(vec![doc("agent-1", "d-1", "deployed", "2024-01-01T00:00:00Z")]);
    source.publish("agent-1", batch.clone());

    first.unsubscribe();
    source.publish("agent-1", batch);

    assert_eq!(first_views.lock().unwrap().len(), 1);
    assert_eq!(second_views.lock().unwrap().len(), 2);
    assert!(other_views.lock().unwrap().is_empty());
}

#[test]
fn test_malformed_records_are_reported_and_skipped() {
    let source = Arc::new(MemorySource::new());

    let skipped: Arc<Mutex<Vec<MalformedRecordError>>> = Arc::new(Mutex::new(Vec::new()));
    let reporter = skipped.clone();
    let watcher = DeploymentWatcher::new(source.clone())
        .with_diagnostics(move |err| reporter.lock().unwrap().push(err));

    let (views, on_update) = view_sink();
    let _handle = watcher.subscribe("agent-1", on_update, |_| {}).unwrap();

    source.publish(
        "agent-1",
        ChangeBatch::upserts(vec![
            doc("agent-1", "d-1", "deployed", "2024-01-01T00:00:00Z"),
            json!({"deployment_id": "d-2", "agent_id": "agent-1", "status": "nonsense",
                   "updated_at": "2024-01-01T00:00:00Z"}),
        ]),
    );

    let views = views.lock().unwrap();
    assert_eq!(views.len(), 1);
    assert!(views[0].is_deployed);
    assert_eq!(views[0].latest_deployment.as_ref().unwrap().deployment_id, "d-1");

    let skipped = skipped.lock().unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].deployment_id(), Some("d-2"));
}

#[test]
fn test_foreign_agent_records_are_dropped() {
    let source = Arc::new(MemorySource::new());
    let watcher = DeploymentWatcher::new(source.clone());

    let (views, on_update) = view_sink();
    let _handle = watcher.subscribe("agent-1", on_update, |_| {}).unwrap();

    source.publish(
        "agent-1",
        ChangeBatch::upserts(vec![doc("agent-2", "d-1", "deployed", "2024-01-01T00:00:00Z")]),
    );

    let views = views.lock().unwrap();
    assert_eq!(views.len(), 1);
    assert!(!views[0].is_deployed);
    assert!(views[0].latest_deployment.is_none());
}
