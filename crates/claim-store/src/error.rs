//! Error types for claim-store

use thiserror::Error;

/// Errors returned by claim store backends
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The store wants credentials before it will accept the claim
    #[error("authentication required: {message}")]
    AuthRequired { message: String },

    /// The store looked at the claim and refused it
    #[error("claim rejected by store: {message}")]
    ValidationRejected { message: String },

    /// No claim under this id or hash
    #[error("claim not found: {key}")]
    NotFound { key: String },

    /// Network failure or unexpected status
    #[error("store unreachable: {0}")]
    Transport(String),

    /// Serialization error
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The client could not be built from its configuration
    #[error("invalid store configuration: {0}")]
    Config(String),
}

impl StoreError {
    /// Whether retrying the same save later can succeed without re-rendering.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::AuthRequired { .. }
                | StoreError::ValidationRejected { .. }
                | StoreError::Transport(_)
        )
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Serialization(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Classify a non-success HTTP response from the claims API.
pub fn classify_status(status: u16, key: &str, body: &str) -> StoreError {
    let message = body_message(body);
    match status {
        401 | 403 => StoreError::AuthRequired { message },
        400 | 409 | 422 => StoreError::ValidationRejected { message },
        404 => StoreError::NotFound {
            key: key.to_string(),
        },
        _ => StoreError::Transport(format!("HTTP {}: {}", status, message)),
    }
}

fn body_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
