//! Verification: report classification, the state machine, and the
//! session that drives it against a renderer and a claim store.

pub mod classify;
pub mod error;
pub mod session;
pub mod state;

pub use classify::{classify_check, classify_seal, SealReport, VerificationReport};
pub use error::VerifyError;
pub use session::{new_claim, PendingCheck, PendingSave, PendingSeal, VerificationSession};
pub use state::{
    transition, Event, Operation, Outcome, RequestToken, TokenSource, VerificationState,
};
