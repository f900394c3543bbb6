//! View registry integration tests

use statusd::cache::views::ViewRegistry;
use statusd::models::view::AgentDeploymentView;

fn deployed_view() -> AgentDeploymentView {
    AgentDeploymentView {
        is_deployed: true,
        ..Default::default()
    }
}

#[test]
fn test_publish_and_get() {
    let registry = ViewRegistry::new();
    assert!(registry.is_empty());
    assert!(registry.get("agent-1").is_none());

    registry.publish("agent-1", deployed_view());

    let entry = registry.get("agent-1").unwrap();
    assert!(entry.view.is_deployed);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_publish_replaces_previous_view() {
    let registry = ViewRegistry::new();

    registry.publish("agent-1", deployed_view());
    registry.publish("agent-1", AgentDeploymentView::default());

    let entry = registry.get("agent-1").unwrap();
    assert!(!entry.view.is_deployed);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_remove_and_agent_ids() {
    let registry = ViewRegistry::new();

    registry.publish("agent-1", deployed_view());
    registry.publish("agent-2", AgentDeploymentView::default());

    let mut ids = registry.agent_ids();
    ids.sort();
    assert_eq!(ids, vec!["agent-1".to_string(), "agent-2".to_string()]);

    assert!(registry.remove("agent-1").is_some());
    assert!(registry.get("agent-1").is_none());
    assert_eq!(registry.len(), 1);
}
