//! Turning renderer responses into reports.
//!
//! Hashes are always compared locally. The renderer's own `verified`
//! flag is kept for the record and a disagreement only warns.

use chrono::{DateTime, Utc};
use render_client::{RenderResponse, VerifyResponse};
use serde::Serialize;

use crate::domain::bundle::{Baseline, Bundle, Mode};
use crate::domain::error::Result;
use crate::domain::fingerprint::{fingerprint_snapshot, Fingerprint};
use crate::domain::hash::{compare, HashCheck, HashKind};

use super::error::VerifyError;

/// Comparison of a re-render against the sealed baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub mode: Mode,
    pub poster: HashCheck,
    /// Present only in loop mode
    pub animation: Option<HashCheck>,
    pub renderer_verified: Option<bool>,
    pub warnings: Vec<String>,
}

impl VerificationReport {
    pub fn poster_verified(&self) -> bool {
        self.poster.matched
    }

    /// True when no animation hash is required.
    pub fn animation_verified(&self) -> bool {
        self.animation.as_ref().map_or(true, |c| c.matched)
    }

    /// Every required hash matched.
    pub fn is_match(&self) -> bool {
        self.poster_verified() && self.animation_verified()
    }

    pub fn mismatched(&self) -> Vec<HashKind> {
        std::iter::once(&self.poster)
            .chain(self.animation.as_ref())
            .filter(|c| !c.matched)
            .map(|c| c.kind)
            .collect()
    }

    pub fn summary(&self) -> String {
        if self.is_match() {
            return format!("verified: {} output reproduces the baseline", self.mode);
        }
        let names: Vec<&str> = self.mismatched().iter().map(|k| k.field()).collect();
        format!("failed: {} does not match the baseline", names.join(" and "))
    }
}

/// Hashes captured by a render round-trip, ready to seal a draft.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SealReport {
    pub mode: Mode,
    pub fingerprint: Fingerprint,
    pub baseline: Baseline,
    pub renderer_version: Option<String>,
    pub protocol_version: Option<String>,
    pub warnings: Vec<String>,
}

impl SealReport {
    /// Rebuild the report for a bundle sealed earlier, without rendering.
    pub fn from_sealed(bundle: &Bundle) -> std::result::Result<Self, VerifyError> {
        if !bundle.is_sealed() {
            return Err(VerifyError::MissingBaseline);
        }
        let mode = bundle.resolved_mode();
        if !bundle.baseline.is_complete(mode) {
            return Err(VerifyError::ModeFieldMismatch {
                mode,
                missing: vec!["baseline.animationHash".to_string()],
            });
        }
        let fingerprint = fingerprint_snapshot(&bundle.snapshot)
            .map_err(|e| VerifyError::InvalidSnapshot(vec![e.to_string()]))?;
        let protocol_version = Some(bundle.canonical.protocol_version.clone())
            .filter(|v| !v.is_empty());
        Ok(SealReport {
            mode,
            fingerprint,
            baseline: bundle.baseline.clone(),
            renderer_version: None,
            protocol_version,
            warnings: Vec::new(),
        })
    }

    /// Seal `bundle` with this report's baseline.
    pub fn apply_to(&self, bundle: &mut Bundle, at: DateTime<Utc>) -> Result<()> {
        bundle.seal(self.baseline.clone(), self.protocol_version.as_deref(), at)
    }
}

/// Compare a `/verify` response with the bundle's baseline.
///
/// A response missing a hash the mode requires is malformed, not a mismatch.
pub fn classify_check(
    bundle: &Bundle,
    response: &VerifyResponse,
) -> std::result::Result<VerificationReport, VerifyError> {
    let mode = bundle.resolved_mode();
    let computed_poster = response.computed_poster().ok_or_else(|| {
        VerifyError::MalformedResponse("response carries no computed poster hash".to_string())
    })?;
    let poster = compare(
        HashKind::Poster,
        &bundle.baseline.poster_hash,
        Some(computed_poster),
    );

    let animation = match mode {
        Mode::Static => None,
        Mode::Loop => {
            let computed = response.computed_animation().ok_or_else(|| {
                VerifyError::MalformedResponse(
                    "loop response carries no computed animation hash".to_string(),
                )
            })?;
            let expected = bundle.baseline.animation().unwrap_or_default();
            Some(compare(HashKind::Animation, expected, Some(computed)))
        }
    };

    let mut report = VerificationReport {
        mode,
        poster,
        animation,
        renderer_verified: response.verified,
        warnings: Vec::new(),
    };
    if let Some(claimed) = response.verified {
        if claimed != report.is_match() {
            report.warnings.push(format!(
                "renderer reported verified={} but local comparison says {}",
                claimed,
                report.is_match()
            ));
        }
    }
    Ok(report)
}

/// Build the baseline from a `/render` response.
pub fn classify_seal(
    bundle: &Bundle,
    response: &RenderResponse,
    fingerprint: Fingerprint,
) -> std::result::Result<SealReport, VerifyError> {
    let mode = bundle.resolved_mode();
    let poster = response.poster().ok_or_else(|| {
        VerifyError::MalformedResponse("render response carries no poster hash".to_string())
    })?;
    let animation = match mode {
        Mode::Static => None,
        Mode::Loop => Some(
            response
                .animation()
                .ok_or_else(|| {
                    VerifyError::MalformedResponse(
                        "loop render response carries no animation hash".to_string(),
                    )
                })?
                .to_string(),
        ),
    };

    Ok(SealReport {
        mode,
        fingerprint,
        baseline: Baseline::new(poster, animation),
        renderer_version: response.metadata.renderer_version.clone(),
        protocol_version: response.metadata.protocol_version.clone(),
        warnings: Vec::new(),
    })
}
