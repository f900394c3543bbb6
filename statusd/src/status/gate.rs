//! Feature gate
//!
//! Deterministic mapping from a derived deployment view to the set of studio
//! features that may be used. Gating decisions consult nothing beyond the
//! given view, so the same view always yields the same decision.

use serde::{Deserialize, Serialize};

use crate::models::view::AgentDeploymentView;

/// Studio features whose availability can depend on deployment state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Channel integration setup (WhatsApp, Slack, web widget)
    Integration,

    /// Conversation analytics dashboards
    Analytics,

    /// Testing against the live production endpoint
    ProductionTesting,

    /// Agent configuration wizard
    AgentEditing,

    /// Knowledge base file management
    KnowledgeBase,

    /// Pre-deployment sandbox chat
    SandboxChat,

    /// Billing and credits panel
    Billing,
}

impl Feature {
    pub const ALL: [Feature; 7] = [
        Feature::Integration,
        Feature::Analytics,
        Feature::ProductionTesting,
        Feature::AgentEditing,
        Feature::KnowledgeBase,
        Feature::SandboxChat,
        Feature::Billing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Integration => "integration",
            Feature::Analytics => "analytics",
            Feature::ProductionTesting => "production_testing",
            Feature::AgentEditing => "agent_editing",
            Feature::KnowledgeBase => "knowledge_base",
            Feature::SandboxChat => "sandbox_chat",
            Feature::Billing => "billing",
        }
    }

    /// Features that only make sense against a running service
    fn requires_deployment(&self) -> bool {
        matches!(
            self,
            Feature::Integration | Feature::Analytics | Feature::ProductionTesting
        )
    }
}

impl std::str::FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "integration" => Ok(Feature::Integration),
            "analytics" => Ok(Feature::Analytics),
            "production_testing" => Ok(Feature::ProductionTesting),
            "agent_editing" => Ok(Feature::AgentEditing),
            "knowledge_base" => Ok(Feature::KnowledgeBase),
            "sandbox_chat" => Ok(Feature::SandboxChat),
            "billing" => Ok(Feature::Billing),
            _ => Err(format!("Invalid feature: {}", s)),
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a feature is gated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateReason {
    RequiresDeployment,
}

/// Outcome of a gating decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    pub enabled: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<GateReason>,
}

impl GateDecision {
    fn enabled() -> Self {
        Self {
            enabled: true,
            reason: None,
        }
    }

    fn gated(reason: GateReason) -> Self {
        Self {
            enabled: false,
            reason: Some(reason),
        }
    }
}

/// Decide whether `feature` is available given the agent's deployment view
pub fn evaluate(view: &AgentDeploymentView, feature: Feature) -> GateDecision {
    if feature.requires_deployment() && !view.is_deployed {
        return GateDecision::gated(GateReason::RequiresDeployment);
    }
    GateDecision::enabled()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gated_features_follow_is_deployed() {
        let undeployed = AgentDeploymentView::default();
        let deployed = AgentDeploymentView {
            is_deployed: true,
            ..Default::default()
        };

        for feature in [Feature::Integration, Feature::Analytics, Feature::ProductionTesting] {
            assert!(!evaluate(&undeployed, feature).enabled);
            assert_eq!(
                evaluate(&undeployed, feature).reason,
                Some(GateReason::RequiresDeployment)
            );
            assert!(evaluate(&deployed, feature).enabled);
            assert!(evaluate(&deployed, feature).reason.is_none());
        }
    }

    #[test]
    fn test_ungated_features_always_enabled() {
        let undeployed = AgentDeploymentView::default();

        for feature in [
            Feature::AgentEditing,
            Feature::KnowledgeBase,
            Feature::SandboxChat,
            Feature::Billing,
        ] {
            let decision = evaluate(&undeployed, feature);
            assert!(decision.enabled);
            assert!(decision.reason.is_none());
        }
    }

    #[test]
    fn test_feature_names_round_trip() {
        for feature in Feature::ALL {
            assert_eq!(feature.as_str().parse::<Feature>(), Ok(feature));
        }
    }
}
