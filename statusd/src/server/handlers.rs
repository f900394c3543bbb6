//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::view::AgentDeploymentView;
use crate::server::state::ServerState;
use crate::status::gate::{evaluate, Feature, GateReason};
use crate::utils::version_info;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "alchemist-statusd".to_string(),
        version: version.version,
    })
}

/// Version response
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

/// Derived deployment view response
#[derive(Debug, Serialize)]
pub struct DeploymentViewResponse {
    pub agent_id: String,

    #[serde(flatten)]
    pub view: AgentDeploymentView,

    pub published_at: DateTime<Utc>,
}

/// Deployment view handler
pub async fn deployment_view_handler(
    State(state): State<Arc<ServerState>>,
    Path(agent_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    state.activity_tracker.touch();

    let entry = state.views.get(&agent_id).ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(DeploymentViewResponse {
        agent_id,
        view: entry.view,
        published_at: entry.published_at,
    }))
}

#[derive(Debug, Serialize)]
pub struct FeatureDecision {
    pub feature: Feature,
    pub enabled: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<GateReason>,
}

/// Feature list response
#[derive(Debug, Serialize)]
pub struct FeaturesResponse {
    pub agent_id: String,
    pub features: Vec<FeatureDecision>,
}

/// All feature gate decisions for an agent
pub async fn features_handler(
    State(state): State<Arc<ServerState>>,
    Path(agent_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    state.activity_tracker.touch();

    let entry = state.views.get(&agent_id).ok_or(StatusCode::NOT_FOUND)?;

    let features = Feature::ALL
        .iter()
        .map(|&feature| {
            let decision = evaluate(&entry.view, feature);
            FeatureDecision {
                feature,
                enabled: decision.enabled,
                reason: decision.reason,
            }
        })
        .collect();

    Ok(Json(FeaturesResponse { agent_id, features }))
}

/// Single feature gate decision
pub async fn feature_handler(
    State(state): State<Arc<ServerState>>,
    Path((agent_id, feature)): Path<(String, String)>,
) -> Result<impl IntoResponse, StatusCode> {
    state.activity_tracker.touch();

    let feature: Feature = feature.parse().map_err(|_| StatusCode::BAD_REQUEST)?;
    let entry = state.views.get(&agent_id).ok_or(StatusCode::NOT_FOUND)?;

    let decision = evaluate(&entry.view, feature);
    Ok(Json(FeatureDecision {
        feature,
        enabled: decision.enabled,
        reason: decision.reason,
    }))
}
