//! claimseal Core Library
//!
//! Bundle schema, validation, hash comparison and the verification state
//! machine for sealed deterministic-render claims.
//!
//! ## Layer 2 - Domain
//!
//! Everything here is synchronous and side-effect free except the
//! `VerificationSession`, which talks to a `Renderer` and a `ClaimStore`.

pub mod bundle_file;
pub mod config;
pub mod domain;
pub mod obs;
pub mod tamper;
pub mod telemetry;
pub mod verify;

pub use domain::{
    check_submission, compare, compute_fingerprint, detect_stale_render, fingerprint_snapshot,
    hashes_equal, normalize_hash, parse_bundle, resolve_mode, resolve_mode_value, upgrade_bundle,
    validate, validate_bundle, validate_value, Baseline, Bundle, BundleVersion, CheckVerdict,
    Claim, ClaimDetails, ClaimType, ClaimsealError, Fingerprint, HashCheck, HashKind, Mode,
    RenderObservation, ResolvedMode, Result, Source, SubmissionError, ValidationResult,
};

pub use config::{ClaimsealConfig, ConfigOverrides};

pub use tamper::{tamper_bundle, Tamper};

pub use telemetry::init_tracing;

pub use verify::{
    Outcome, SealReport, VerificationReport, VerificationSession, VerificationState, VerifyError,
};

pub use render_client::{Execution, Snapshot};

/// Library version, shared by every crate in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
