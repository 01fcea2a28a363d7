//! Domain-level error taxonomy for claimseal.

use super::bundle::Mode;
use super::submission::SubmissionError;

/// claimseal domain errors.
#[derive(Debug, thiserror::Error)]
pub enum ClaimsealError {
    #[error("invalid bundle: {0}")]
    InvalidBundle(String),

    #[error("bundle is already sealed; snapshot and baseline are immutable")]
    AlreadySealed,

    #[error("incomplete baseline for {mode} mode: {detail}")]
    IncompleteBaseline { mode: Mode, detail: String },

    #[error("cannot fingerprint snapshot: {0}")]
    Fingerprint(String),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for claimseal domain operations.
pub type Result<T> = std::result::Result<T, ClaimsealError>;
