//! Structured observability hooks for the verification lifecycle.
//!
//! This module provides:
//! - Request-scoped tracing spans via the `VerificationSpan` RAII guard
//! - Emission functions for check, seal and save resolution, discarded
//!   stale responses and suspected stale renders
//!
//! Events are emitted at `info!` level, anomalies at `warn!`
//! (filter with `CLAIMSEAL_LOG`).

use tracing::{info, warn};

use crate::verify::state::{Operation, RequestToken};

/// RAII guard that enters a request-scoped span for one renderer or store call.
///
/// ```ignore
/// let _span = VerificationSpan::enter(Operation::Check, token);
/// // tracing calls now carry op = "check", token = 3
/// ```
pub struct VerificationSpan {
    _span: tracing::span::EnteredSpan,
}

impl VerificationSpan {
    pub fn enter(op: Operation, token: RequestToken) -> Self {
        Self {
            _span: request_span(op, token).entered(),
        }
    }
}

/// Span for one request, for instrumenting futures that cross an `.await`.
pub fn request_span(op: Operation, token: RequestToken) -> tracing::Span {
    tracing::info_span!(
        "claimseal.request",
        op = op.as_str(),
        token = token.value()
    )
}

/// Emit event: a check request was sent to the renderer.
pub fn emit_check_started(token: RequestToken, mode: &str, fingerprint: &str) {
    info!(
        event = "check.started",
        token = token.value(),
        mode = %mode,
        fingerprint = %fingerprint,
    );
}

/// Emit event: a check reached a terminal state.
pub fn emit_check_resolved(token: RequestToken, state: &str, mismatched: &[&str]) {
    info!(
        event = "check.resolved",
        token = token.value(),
        state = %state,
        mismatched = ?mismatched,
    );
}

pub fn emit_seal_resolved(token: RequestToken, state: &str, poster_hash: Option<&str>) {
    info!(
        event = "seal.resolved",
        token = token.value(),
        state = %state,
        poster_hash = poster_hash.unwrap_or(""),
    );
}

pub fn emit_save_resolved(token: RequestToken, state: &str, claim_id: Option<&str>) {
    info!(
        event = "save.resolved",
        token = token.value(),
        state = %state,
        claim_id = claim_id.unwrap_or(""),
    );
}

/// Emit event: a response arrived for a request that is no longer in flight.
pub fn emit_stale_response_discarded(token: RequestToken, in_flight: Option<RequestToken>) {
    warn!(
        event = "response.stale_discarded",
        token = token.value(),
        in_flight = in_flight.map(RequestToken::value),
    );
}

/// Emit event: changed inputs rendered to an unchanged poster hash.
pub fn emit_stale_render(warning: &str) {
    warn!(event = "render.stale_output", detail = %warning);
}
