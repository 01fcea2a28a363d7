//! Domain models for claimseal.
//!
//! Canonical definitions for the core entities:
//! - `Bundle`: claim, sources, snapshot and baseline as exported
//! - `ValidationResult`: what a bundle text is missing
//! - `Fingerprint`: deterministic identity of snapshot inputs

pub mod bundle;
pub mod error;
pub mod fingerprint;
pub mod hash;
pub mod migration;
pub mod mode;
pub mod submission;
pub mod validation;

pub use bundle::{
    bundle_from_value, parse_bundle, Baseline, Bundle, Canonical, CheckRecord, CheckVerdict,
    Claim, ClaimDetails, ClaimType, GenericDetails, Mode, PnlDetails, Source, SportsDetails,
    BUNDLE_VERSION,
};
pub use error::{ClaimsealError, Result};
pub use fingerprint::{
    canonical_json, compute_fingerprint, detect_stale_render, fingerprint_snapshot, Fingerprint,
    RenderObservation,
};
pub use hash::{compare, hashes_equal, normalize_hash, HashCheck, HashKind};
pub use migration::{upgrade_bundle, BundleVersion, Upgraded};
pub use mode::{mode_of, resolve_mode, resolve_mode_value, ResolvedMode};
pub use submission::{check_submission, SubmissionError};
pub use validation::{validate, validate_bundle, validate_value, ValidationResult};
