//! Drives the state machine against a renderer and a claim store.
//!
//! Each operation is split into a synchronous `begin_*` that validates
//! the bundle and allocates a request token, and a `complete_*` that
//! feeds the response back. The async `check`, `seal` and `save` run
//! both halves around the network call. Splitting them lets callers
//! interleave requests and exercise stale-response handling.

use claim_store::{ClaimRecord, ClaimStore, NewClaim, StoreError, StoreResult};
use render_client::{RenderResponse, RenderResult, Renderer, VerifyRequest, VerifyResponse};
use tracing::{debug, Instrument};

use crate::domain::bundle::{Bundle, Mode};
use crate::domain::fingerprint::{
    detect_stale_render, fingerprint_snapshot, Fingerprint, RenderObservation,
};
use crate::domain::hash::{hashes_equal, normalize_hash};
use crate::domain::submission::check_submission;
use crate::domain::validation::validate_bundle;
use crate::obs;

use super::classify::{classify_check, classify_seal, SealReport};
use super::error::VerifyError;
use super::state::{transition, Event, Operation, RequestToken, TokenSource, VerificationState};

/// A `/verify` request waiting to be sent, with the bundle it checks.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCheck {
    pub token: RequestToken,
    pub bundle: Bundle,
    pub request: VerifyRequest,
    pub fingerprint: Fingerprint,
}

/// A `/render` request for a draft waiting to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSeal {
    pub token: RequestToken,
    pub bundle: Bundle,
    pub fingerprint: Fingerprint,
}

/// A claim waiting to be written to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSave {
    pub token: RequestToken,
    pub claim: NewClaim,
}

pub struct VerificationSession<R, S> {
    renderer: R,
    store: S,
    state: VerificationState,
    tokens: TokenSource,
    last_observation: Option<RenderObservation>,
}

impl<R: Renderer, S: ClaimStore> VerificationSession<R, S> {
    pub fn new(renderer: R, store: S) -> Self {
        VerificationSession {
            renderer,
            store,
            state: VerificationState::Idle,
            tokens: TokenSource::new(),
            last_observation: None,
        }
    }

    pub fn state(&self) -> &VerificationState {
        &self.state
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn last_observation(&self) -> Option<&RenderObservation> {
        self.last_observation.as_ref()
    }

    pub fn reset(&mut self) {
        self.dispatch(Event::Reset);
    }

    fn dispatch(&mut self, event: Event) {
        let state = std::mem::take(&mut self.state);
        self.state = transition(state, event);
    }

    fn reject<T>(&mut self, err: VerifyError) -> Result<T, VerifyError> {
        debug!(error = %err, "request rejected before any network call");
        self.dispatch(Event::Reject(err.clone()));
        Err(err)
    }

    /// False (and logged) when `token` is no longer the one in flight.
    fn accepts(&self, token: RequestToken) -> bool {
        let in_flight = self.state.in_flight_token();
        if in_flight == Some(token) {
            true
        } else {
            obs::emit_stale_response_discarded(token, in_flight);
            false
        }
    }

    /// Record a completed render and return a stale-output warning, if any.
    fn observe(&mut self, fingerprint: &Fingerprint, poster_hash: &str) -> Option<String> {
        let current = RenderObservation::new(fingerprint.clone(), poster_hash);
        let warning = self
            .last_observation
            .as_ref()
            .and_then(|prev| detect_stale_render(prev, &current));
        if let Some(w) = &warning {
            obs::emit_stale_render(w);
        }
        self.last_observation = Some(current);
        warning
    }

    // -----------------------------------------------------------------------
    // Check
    // -----------------------------------------------------------------------

    /// Validate a sealed bundle and move to `Checking`.
    ///
    /// Any problem moves straight to `Error` without touching the renderer.
    pub fn begin_check(&mut self, bundle: &Bundle) -> Result<PendingCheck, VerifyError> {
        let validation = validate_bundle(bundle);
        let structural: Vec<String> = validation
            .structural_missing()
            .into_iter()
            .map(str::to_string)
            .collect();
        if !structural.is_empty() {
            return self.reject(VerifyError::MissingFields(structural));
        }
        if !bundle.is_sealed() {
            return self.reject(VerifyError::MissingBaseline);
        }
        let mode = bundle.resolved_mode();
        if !validation.missing_hash_fields.is_empty() {
            return self.reject(VerifyError::ModeFieldMismatch {
                mode,
                missing: validation.missing_hash_fields,
            });
        }
        let fingerprint = match fingerprint_snapshot(&bundle.snapshot) {
            Ok(fp) => fp,
            Err(e) => return self.reject(VerifyError::InvalidSnapshot(vec![e.to_string()])),
        };

        let baseline = &bundle.baseline;
        let request = match mode {
            Mode::Static => VerifyRequest::still(bundle.snapshot.clone(), &baseline.poster_hash),
            Mode::Loop => VerifyRequest::looping(
                bundle.snapshot.clone(),
                &baseline.poster_hash,
                baseline.animation().unwrap_or_default(),
            ),
        };

        let token = self.tokens.next_token();
        self.dispatch(Event::BeginCheck(token));
        obs::emit_check_started(token, mode.as_str(), &fingerprint.to_string());
        Ok(PendingCheck {
            token,
            bundle: bundle.clone(),
            request,
            fingerprint,
        })
    }

    /// Feed a `/verify` response back. Stale responses are discarded.
    ///
    /// The response is judged against the bundle `begin_check` accepted.
    pub fn complete_check(
        &mut self,
        pending: PendingCheck,
        response: RenderResult<VerifyResponse>,
    ) -> &VerificationState {
        if !self.accepts(pending.token) {
            return &self.state;
        }
        let _span = obs::VerificationSpan::enter(Operation::Check, pending.token);

        let mut result = response
            .map_err(VerifyError::from)
            .and_then(|r| classify_check(&pending.bundle, &r));
        if let Ok(report) = &mut result {
            let computed = report.poster.computed.clone().unwrap_or_default();
            if let Some(warning) = self.observe(&pending.fingerprint, &computed) {
                report.warnings.push(warning);
            }
        }

        let mismatched: Vec<&'static str> = match &result {
            Ok(report) => report.mismatched().iter().map(|k| k.field()).collect(),
            Err(_) => Vec::new(),
        };
        self.dispatch(Event::CheckResolved {
            token: pending.token,
            result,
        });
        obs::emit_check_resolved(pending.token, self.state.name(), &mismatched);
        &self.state
    }

    /// Re-render a sealed bundle and compare against its baseline.
    pub async fn check(&mut self, bundle: &Bundle) -> &VerificationState {
        let Ok(pending) = self.begin_check(bundle) else {
            return &self.state;
        };
        let response = self
            .renderer
            .verify(&pending.request)
            .instrument(obs::request_span(Operation::Check, pending.token))
            .await;
        self.complete_check(pending, response)
    }

    // -----------------------------------------------------------------------
    // Seal
    // -----------------------------------------------------------------------

    /// Validate a draft and move to `Sealing`.
    pub fn begin_seal(&mut self, bundle: &Bundle) -> Result<PendingSeal, VerifyError> {
        let structural: Vec<String> = validate_bundle(bundle)
            .structural_missing()
            .into_iter()
            .map(str::to_string)
            .collect();
        if !structural.is_empty() {
            return self.reject(VerifyError::MissingFields(structural));
        }
        if bundle.is_sealed() {
            return self.reject(VerifyError::AlreadySealed);
        }
        if let Err(violations) = bundle.snapshot.check() {
            let problems = violations.iter().map(ToString::to_string).collect();
            return self.reject(VerifyError::InvalidSnapshot(problems));
        }
        let fingerprint = match fingerprint_snapshot(&bundle.snapshot) {
            Ok(fp) => fp,
            Err(e) => return self.reject(VerifyError::InvalidSnapshot(vec![e.to_string()])),
        };

        let token = self.tokens.next_token();
        self.dispatch(Event::BeginSeal(token));
        debug!(token = token.value(), fingerprint = %fingerprint, "sealing draft");
        Ok(PendingSeal {
            token,
            bundle: bundle.clone(),
            fingerprint,
        })
    }

    /// Feed a `/render` response back. Stale responses are discarded.
    pub fn complete_seal(
        &mut self,
        pending: PendingSeal,
        response: RenderResult<RenderResponse>,
    ) -> &VerificationState {
        if !self.accepts(pending.token) {
            return &self.state;
        }
        let _span = obs::VerificationSpan::enter(Operation::Seal, pending.token);

        let mut result = response
            .map_err(VerifyError::from)
            .and_then(|r| classify_seal(&pending.bundle, &r, pending.fingerprint.clone()));
        if let Ok(seal) = &mut result {
            let poster = seal.baseline.poster_hash.clone();
            if let Some(warning) = self.observe(&pending.fingerprint, &poster) {
                seal.warnings.push(warning);
            }
        }

        let poster = result.as_ref().ok().map(|s| s.baseline.poster_hash.clone());
        self.dispatch(Event::SealResolved {
            token: pending.token,
            result,
        });
        obs::emit_seal_resolved(pending.token, self.state.name(), poster.as_deref());
        &self.state
    }

    /// Render a draft to capture its baseline.
    ///
    /// The bundle is not modified; apply the resulting `SealReport` with
    /// [`SealReport::apply_to`].
    pub async fn seal(&mut self, bundle: &Bundle) -> &VerificationState {
        let Ok(pending) = self.begin_seal(bundle) else {
            return &self.state;
        };
        let response = self
            .renderer
            .render(&pending.bundle.snapshot)
            .instrument(obs::request_span(Operation::Seal, pending.token))
            .await;
        self.complete_seal(pending, response)
    }

    // -----------------------------------------------------------------------
    // Save
    // -----------------------------------------------------------------------

    /// Take up a bundle sealed in an earlier session so it can be saved.
    ///
    /// Only an idle session adopts; the renderer is not contacted.
    pub fn adopt_sealed(&mut self, bundle: &Bundle) -> Result<&VerificationState, VerifyError> {
        if self.state != VerificationState::Idle {
            return Err(VerifyError::SaveUnavailable(format!(
                "session is {}, not idle",
                self.state.name()
            )));
        }
        let seal = SealReport::from_sealed(bundle)?;
        debug!(poster_hash = %seal.baseline.poster_hash, "adopting sealed bundle");
        self.dispatch(Event::Adopt(seal));
        Ok(&self.state)
    }

    /// Prepare a sealed bundle for the store and move to `Saving`.
    ///
    /// Only a state holding a seal can save; other states are left as they
    /// are. Submission problems end in `ValidationError`, keeping the seal
    /// so the save can be retried once the bundle is fixed.
    pub fn begin_save(&mut self, bundle: &Bundle) -> Result<PendingSave, VerifyError> {
        let Some(seal) = self.state.sealed() else {
            return Err(VerifyError::SaveUnavailable(format!(
                "session is {}, not holding a sealed render",
                self.state.name()
            )));
        };
        if !hashes_equal(&bundle.baseline.poster_hash, &seal.baseline.poster_hash) {
            return Err(VerifyError::SaveUnavailable(
                "bundle baseline does not match the sealed render; apply the seal first"
                    .to_string(),
            ));
        }

        let token = self.tokens.next_token();
        self.dispatch(Event::BeginSave(token));

        if let Err(problems) = check_submission(bundle) {
            self.dispatch(Event::SaveResolved {
                token,
                result: Err(StoreError::ValidationRejected {
                    message: problems.to_string(),
                }),
            });
            obs::emit_save_resolved(token, self.state.name(), None);
            return Err(VerifyError::Submission(problems));
        }

        let claim = match new_claim(bundle) {
            Ok(claim) => claim,
            Err(e) => {
                self.dispatch(Event::SaveResolved {
                    token,
                    result: Err(StoreError::Serialization(e.to_string())),
                });
                return Err(VerifyError::Serialization(e.to_string()));
            }
        };
        Ok(PendingSave { token, claim })
    }

    /// Feed the store's answer back. Stale answers are discarded.
    pub fn complete_save(
        &mut self,
        pending: PendingSave,
        result: StoreResult<ClaimRecord>,
    ) -> &VerificationState {
        if !self.accepts(pending.token) {
            return &self.state;
        }
        let _span = obs::VerificationSpan::enter(Operation::Save, pending.token);

        let result = result.map(|record| record.id);
        let claim_id = result.as_ref().ok().map(|id| id.0.clone());
        self.dispatch(Event::SaveResolved {
            token: pending.token,
            result,
        });
        obs::emit_save_resolved(pending.token, self.state.name(), claim_id.as_deref());
        &self.state
    }

    /// Persist the sealed bundle. Never re-renders.
    pub async fn save(&mut self, bundle: &Bundle) -> &VerificationState {
        let Ok(pending) = self.begin_save(bundle) else {
            return &self.state;
        };
        let result = self
            .store
            .save(pending.claim.clone())
            .instrument(obs::request_span(Operation::Save, pending.token))
            .await;
        self.complete_save(pending, result)
    }

    /// Look up a stored claim by poster hash, in any accepted notation.
    pub async fn find_sealed(&self, poster_hash: &str) -> StoreResult<ClaimRecord> {
        self.store.get_by_hash(&normalize_hash(poster_hash)).await
    }
}

/// Store payload for a sealed bundle, with hashes in normalized form.
pub fn new_claim(bundle: &Bundle) -> crate::domain::error::Result<NewClaim> {
    Ok(NewClaim {
        poster_hash: normalize_hash(&bundle.baseline.poster_hash),
        animation_hash: bundle.baseline.animation().map(normalize_hash),
        title: bundle.claim.title.clone(),
        claim_type: bundle.claim.claim_type().as_str().to_string(),
        bundle: bundle.to_value()?,
    })
}
