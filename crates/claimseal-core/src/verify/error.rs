//! Why a verification cycle ended in the `Error` state.
//!
//! A hash mismatch is not here: it is a `Failed` report, not an error.

use render_client::RenderError;

use crate::domain::bundle::Mode;
use crate::domain::submission::SubmissionError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VerifyError {
    #[error("bundle is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("bundle is missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    /// Baseline lacks a hash the snapshot's mode requires
    #[error("{mode} bundle is missing {}", missing.join(", "))]
    ModeFieldMismatch { mode: Mode, missing: Vec<String> },

    #[error("bundle has no baseline yet; seal it before checking")]
    MissingBaseline,

    #[error("bundle is already sealed; snapshot and baseline cannot be re-rendered")]
    AlreadySealed,

    #[error("snapshot breaks execution rules: {}", .0.join("; "))]
    InvalidSnapshot(Vec<String>),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error("renderer unreachable: {message}")]
    Transport { message: String, hint: String },

    #[error("renderer rejected the snapshot: {message}")]
    ProtocolViolation { message: String, remediation: String },

    #[error("renderer returned HTTP {status}: {body}")]
    RendererStatus { status: u16, body: String },

    /// Undecodable body, or one missing a hash the mode requires
    #[error("malformed renderer response: {0}")]
    MalformedResponse(String),

    /// The sealed bundle could not be turned into a store payload
    #[error("could not serialize bundle: {0}")]
    Serialization(String),

    /// A save was requested from a state that has nothing sealed to save
    #[error("nothing to save: {0}")]
    SaveUnavailable(String),
}

impl VerifyError {
    /// User-facing next step, when one is known.
    pub fn remediation(&self) -> Option<&str> {
        match self {
            VerifyError::Transport { hint, .. } => Some(hint.as_str()),
            VerifyError::ProtocolViolation { remediation, .. } => Some(remediation.as_str()),
            VerifyError::MissingBaseline => Some("run `claimseal seal` to capture a baseline"),
            _ => None,
        }
    }

    /// Whether the renderer was never contacted.
    pub fn is_local(&self) -> bool {
        !matches!(
            self,
            VerifyError::Transport { .. }
                | VerifyError::ProtocolViolation { .. }
                | VerifyError::RendererStatus { .. }
                | VerifyError::MalformedResponse(_)
        )
    }
}

impl From<RenderError> for VerifyError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Transport { message, hint } => VerifyError::Transport { message, hint },
            RenderError::ProtocolViolation {
                message,
                remediation,
            } => VerifyError::ProtocolViolation {
                message,
                remediation,
            },
            RenderError::Status { status, body } => VerifyError::RendererStatus { status, body },
            RenderError::MalformedResponse(msg) => VerifyError::MalformedResponse(msg),
            RenderError::Config(msg) => VerifyError::Transport {
                message: msg,
                hint: "check the renderer URL and client settings".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_errors_keep_their_guidance() {
        let err: VerifyError = RenderError::ProtocolViolation {
            message: "Math.random is not allowed".to_string(),
            remediation: "use the seeded random source".to_string(),
        }
        .into();
        assert_eq!(err.remediation(), Some("use the seeded random source"));
        assert!(!err.is_local());
    }

    #[test]
    fn test_serialization_is_not_a_parse_error() {
        let err = VerifyError::Serialization("key must be a string".to_string());
        assert_eq!(err.to_string(), "could not serialize bundle: key must be a string");
        assert_ne!(err, VerifyError::MalformedJson("key must be a string".to_string()));
        assert!(err.is_local());
    }

    #[test]
    fn test_mode_mismatch_names_fields() {
        let err = VerifyError::ModeFieldMismatch {
            mode: Mode::Loop,
            missing: vec!["baseline.animationHash".to_string()],
        };
        assert_eq!(err.to_string(), "loop bundle is missing baseline.animationHash");
        assert!(err.is_local());
    }
}
