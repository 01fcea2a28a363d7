//! Verification state machine.
//!
//! `VerificationState` is a closed set of states and [`transition`] is a
//! pure reducer over it. Every request carries a [`RequestToken`]; a
//! resolution whose token is not the one in flight leaves the state
//! untouched, so a slow response can never overwrite a newer one.

use claim_store::{ClaimId, StoreError};
use serde::Serialize;

use super::classify::{SealReport, VerificationReport};
use super::error::VerifyError;

/// Identity of one renderer or store request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out strictly increasing tokens.
#[derive(Debug, Default)]
pub struct TokenSource {
    last: u64,
}

impl TokenSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_token(&mut self) -> RequestToken {
        self.last += 1;
        RequestToken(self.last)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Check,
    Seal,
    Save,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Check => "check",
            Operation::Seal => "seal",
            Operation::Save => "save",
        }
    }
}

/// A successful render round-trip.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Re-render reproduced every baseline hash
    Checked(VerificationReport),
    /// A draft's baseline was captured
    Sealed(SealReport),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum VerificationState {
    #[default]
    Idle,
    Checking {
        token: RequestToken,
    },
    Sealing {
        token: RequestToken,
    },
    Verified(Outcome),
    Failed(VerificationReport),
    Error(VerifyError),
    Saving {
        token: RequestToken,
        seal: SealReport,
    },
    Saved {
        seal: SealReport,
        claim_id: ClaimId,
    },
    AuthRequired {
        seal: SealReport,
        message: String,
    },
    ValidationError {
        seal: SealReport,
        message: String,
    },
    /// Store unreachable or answered unexpectedly
    SaveFailed {
        seal: SealReport,
        message: String,
    },
}

impl VerificationState {
    pub fn name(&self) -> &'static str {
        match self {
            VerificationState::Idle => "idle",
            VerificationState::Checking { .. } => "checking",
            VerificationState::Sealing { .. } => "sealing",
            VerificationState::Verified(_) => "verified",
            VerificationState::Failed(_) => "failed",
            VerificationState::Error(_) => "error",
            VerificationState::Saving { .. } => "saving",
            VerificationState::Saved { .. } => "saved",
            VerificationState::AuthRequired { .. } => "auth_required",
            VerificationState::ValidationError { .. } => "validation_error",
            VerificationState::SaveFailed { .. } => "save_failed",
        }
    }

    /// Token of the request currently awaited, if any.
    pub fn in_flight_token(&self) -> Option<RequestToken> {
        match self {
            VerificationState::Checking { token }
            | VerificationState::Sealing { token }
            | VerificationState::Saving { token, .. } => Some(*token),
            _ => None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight_token().is_some()
    }

    /// Seal awaiting (or retrying) persistence.
    pub fn sealed(&self) -> Option<&SealReport> {
        match self {
            VerificationState::Verified(Outcome::Sealed(seal))
            | VerificationState::AuthRequired { seal, .. }
            | VerificationState::ValidationError { seal, .. }
            | VerificationState::SaveFailed { seal, .. } => Some(seal),
            _ => None,
        }
    }

    pub fn report(&self) -> Option<&VerificationReport> {
        match self {
            VerificationState::Verified(Outcome::Checked(report))
            | VerificationState::Failed(report) => Some(report),
            _ => None,
        }
    }
}

/// Inputs to [`transition`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    BeginCheck(RequestToken),
    BeginSeal(RequestToken),
    BeginSave(RequestToken),
    /// Request refused before any network call
    Reject(VerifyError),
    /// Resume from a bundle sealed in an earlier session
    Adopt(SealReport),
    CheckResolved {
        token: RequestToken,
        result: Result<VerificationReport, VerifyError>,
    },
    SealResolved {
        token: RequestToken,
        result: Result<SealReport, VerifyError>,
    },
    SaveResolved {
        token: RequestToken,
        result: Result<ClaimId, StoreError>,
    },
    Reset,
}

/// Pure reducer.
///
/// - a begin event supersedes whatever was in flight
/// - `BeginSave` only leaves a state holding a seal; elsewhere it is ignored
/// - `Adopt` only applies to `Idle`
/// - resolutions with a stale token are ignored
pub fn transition(state: VerificationState, event: Event) -> VerificationState {
    use VerificationState as S;

    match (state, event) {
        (_, Event::Reset) => S::Idle,
        (_, Event::Reject(err)) => S::Error(err),
        (_, Event::BeginCheck(token)) => S::Checking { token },
        (_, Event::BeginSeal(token)) => S::Sealing { token },
        (S::Idle, Event::Adopt(seal)) => S::Verified(Outcome::Sealed(seal)),

        (
            S::Verified(Outcome::Sealed(seal))
            | S::AuthRequired { seal, .. }
            | S::ValidationError { seal, .. }
            | S::SaveFailed { seal, .. },
            Event::BeginSave(token),
        ) => S::Saving { token, seal },
        (state, Event::BeginSave(_)) => state,

        (S::Checking { token }, Event::CheckResolved { token: t, result }) if t == token => {
            match result {
                Ok(report) if report.is_match() => S::Verified(Outcome::Checked(report)),
                Ok(report) => S::Failed(report),
                Err(err) => S::Error(err),
            }
        }

        (S::Sealing { token }, Event::SealResolved { token: t, result }) if t == token => {
            match result {
                Ok(seal) => S::Verified(Outcome::Sealed(seal)),
                Err(err) => S::Error(err),
            }
        }

        (S::Saving { token, seal }, Event::SaveResolved { token: t, result }) if t == token => {
            match result {
                Ok(claim_id) => S::Saved { seal, claim_id },
                Err(StoreError::AuthRequired { message }) => S::AuthRequired { seal, message },
                Err(StoreError::ValidationRejected { message }) => {
                    S::ValidationError { seal, message }
                }
                Err(other) => S::SaveFailed {
                    seal,
                    message: other.to_string(),
                },
            }
        }

        // Stale or mismatched resolution
        (state, _) => state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bundle::{Baseline, Mode};
    use crate::domain::fingerprint::compute_fingerprint;
    use crate::domain::hash::{compare, HashKind};

    fn report(matched: bool) -> VerificationReport {
        VerificationReport {
            mode: Mode::Static,
            poster: compare(
                HashKind::Poster,
                "aaa",
                Some(if matched { "aaa" } else { "bbb" }),
            ),
            animation: None,
            renderer_verified: None,
            warnings: Vec::new(),
        }
    }

    fn seal() -> SealReport {
        SealReport {
            mode: Mode::Static,
            fingerprint: compute_fingerprint("x", 1, &[1.0; 10], false).unwrap(),
            baseline: Baseline::new("aaa", None),
            renderer_version: None,
            protocol_version: None,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn tokens_increase() {
        let mut source = TokenSource::new();
        let a = source.next_token();
        let b = source.next_token();
        assert!(b > a);
    }

    #[test]
    fn check_resolves_to_verified_or_failed() {
        let mut tokens = TokenSource::new();
        let t = tokens.next_token();
        let checking = transition(VerificationState::Idle, Event::BeginCheck(t));

        let verified = transition(
            checking.clone(),
            Event::CheckResolved {
                token: t,
                result: Ok(report(true)),
            },
        );
        assert_eq!(verified.name(), "verified");

        let failed = transition(
            checking,
            Event::CheckResolved {
                token: t,
                result: Ok(report(false)),
            },
        );
        assert_eq!(failed.name(), "failed");
        assert_eq!(failed.report().unwrap().mismatched(), vec![HashKind::Poster]);
    }

    #[test]
    fn stale_resolution_is_ignored() {
        let mut tokens = TokenSource::new();
        let old = tokens.next_token();
        let new = tokens.next_token();
        let state = transition(
            transition(VerificationState::Idle, Event::BeginCheck(old)),
            Event::BeginCheck(new),
        );
        let after = transition(
            state.clone(),
            Event::CheckResolved {
                token: old,
                result: Ok(report(false)),
            },
        );
        assert_eq!(after, state);
        assert_eq!(after.in_flight_token(), Some(new));
    }

    #[test]
    fn reject_goes_straight_to_error() {
        let state = transition(
            VerificationState::Idle,
            Event::Reject(VerifyError::MissingBaseline),
        );
        assert_eq!(state, VerificationState::Error(VerifyError::MissingBaseline));
    }

    #[test]
    fn save_only_from_a_seal() {
        let mut tokens = TokenSource::new();
        let idle = transition(VerificationState::Idle, Event::BeginSave(tokens.next_token()));
        assert_eq!(idle, VerificationState::Idle);

        let checked = VerificationState::Verified(Outcome::Checked(report(true)));
        let still = transition(checked.clone(), Event::BeginSave(tokens.next_token()));
        assert_eq!(still, checked);

        let sealed = VerificationState::Verified(Outcome::Sealed(seal()));
        let saving = transition(sealed, Event::BeginSave(tokens.next_token()));
        assert_eq!(saving.name(), "saving");
    }

    #[test]
    fn save_errors_keep_the_seal_for_retry() {
        let mut tokens = TokenSource::new();
        let t1 = tokens.next_token();
        let saving = VerificationState::Saving {
            token: t1,
            seal: seal(),
        };
        let auth = transition(
            saving,
            Event::SaveResolved {
                token: t1,
                result: Err(StoreError::AuthRequired {
                    message: "sign in".to_string(),
                }),
            },
        );
        assert_eq!(auth.name(), "auth_required");
        assert_eq!(auth.sealed(), Some(&seal()));

        let t2 = tokens.next_token();
        let retry = transition(auth, Event::BeginSave(t2));
        let saved = transition(
            retry,
            Event::SaveResolved {
                token: t2,
                result: Ok(ClaimId("c-1".to_string())),
            },
        );
        assert_eq!(
            saved,
            VerificationState::Saved {
                seal: seal(),
                claim_id: ClaimId("c-1".to_string()),
            }
        );
    }

    #[test]
    fn adopt_only_from_idle() {
        let adopted = transition(VerificationState::Idle, Event::Adopt(seal()));
        assert_eq!(adopted.sealed(), Some(&seal()));

        let failed = VerificationState::Failed(report(false));
        assert_eq!(transition(failed.clone(), Event::Adopt(seal())), failed);
    }

    #[test]
    fn store_transport_failure_is_save_failed() {
        let t = TokenSource::new().next_token();
        let state = transition(
            VerificationState::Saving {
                token: t,
                seal: seal(),
            },
            Event::SaveResolved {
                token: t,
                result: Err(StoreError::Transport("connection refused".to_string())),
            },
        );
        assert_eq!(state.name(), "save_failed");
    }
}
