//! Error types for the status daemon

use thiserror::Error;

/// Main error type for the status daemon
#[derive(Error, Debug)]
pub enum StatusError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Subscription error: {0}")]
    SubscriptionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for StatusError {
    fn from(err: anyhow::Error) -> Self {
        StatusError::Internal(err.to_string())
    }
}

/// The underlying record source failed to deliver updates.
///
/// Surfaced at most once per subscription; the subscription is left in a
/// degraded state and the caller decides whether to resubscribe.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("subscription transport error: {message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A deployment record document that cannot be interpreted.
///
/// Malformed records are skipped rather than failing the whole view
/// computation for an agent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedRecordError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("record {deployment_id:?} is missing required field `{field}`")]
    MissingField {
        deployment_id: Option<String>,
        field: &'static str,
    },

    #[error("record {deployment_id:?} has unrecognized status `{value}`")]
    UnknownStatus {
        deployment_id: Option<String>,
        value: String,
    },

    #[error("record {deployment_id:?} has invalid timestamp in `{field}`")]
    InvalidTimestamp {
        deployment_id: Option<String>,
        field: &'static str,
    },
}

impl MalformedRecordError {
    /// Deployment ID of the offending record, when one could be read
    pub fn deployment_id(&self) -> Option<&str> {
        match self {
            MalformedRecordError::NotAnObject => None,
            MalformedRecordError::MissingField { deployment_id, .. }
            | MalformedRecordError::UnknownStatus { deployment_id, .. }
            | MalformedRecordError::InvalidTimestamp { deployment_id, .. } => {
                deployment_id.as_deref()
            }
        }
    }
}
