//! Render-Client: Deterministic Renderer Protocol for claimseal
//!
//! This crate is the only place that talks to the external rendering
//! service. It defines the snapshot wire shape, the `/render` and
//! `/verify` request/response types, and a `Renderer` trait with an HTTP
//! implementation and an in-memory stub.
//!
//! ## Layer 1 - External Collaborator
//!
//! Focus: faithful wire contract and precise error classification. The
//! renderer's hash computation is opaque and never reimplemented here.

mod config;
mod error;
pub mod fakes;
mod hash;
mod http;
mod protocol;
mod snapshot;

pub use config::{RendererConfig, DEFAULT_RENDERER_URL, RENDERER_URL_ENV};
pub use error::{classify_status, remediation_for, RenderError};
pub use hash::{hashes_equal, normalize_hash};
pub use http::HttpRenderer;
pub use protocol::{RenderMetadata, RenderResponse, Renderer, VerifyRequest, VerifyResponse};
pub use snapshot::{Execution, Snapshot, SnapshotViolation, VARS_LEN, VAR_MAX, VAR_MIN};

/// Result type for renderer operations
pub type RenderResult<T> = std::result::Result<T, RenderError>;
