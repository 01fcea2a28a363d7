//! Storage trait definitions for claimseal
//!
//! `ClaimStore` is the only persistence abstraction: a keyed collection of
//! sealed claims, addressable by opaque id and by poster hash.
//!
//! Hashes are stored and looked up in normalized form (no `sha256:`
//! prefix, lowercase). Normalizing is the caller's job; stores compare
//! hash keys exactly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Result type for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Opaque identifier assigned by the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(pub String);

impl ClaimId {
    /// Generate a new random ClaimId
    pub fn new() -> Self {
        ClaimId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for ClaimId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClaimId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A claim submitted for persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClaim {
    /// Normalized poster hash; the store's secondary key
    pub poster_hash: String,
    /// Normalized animation hash for looping claims
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_hash: Option<String>,
    pub title: String,
    pub claim_type: String,
    /// The full sealed bundle as exported JSON
    pub bundle: serde_json::Value,
}

/// A persisted sealed claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    pub id: ClaimId,
    pub poster_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_hash: Option<String>,
    pub title: String,
    pub claim_type: String,
    pub bundle: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Sealed claim store.
///
/// Guarantees:
/// - `save` either persists the claim and returns its record, or fails
///   without side effects.
/// - `AuthRequired` and `ValidationRejected` leave the caller free to
///   retry the same `NewClaim`.
/// - `list` returns claims newest first.
#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// List all sealed claims, newest first.
    async fn list(&self) -> StoreResult<Vec<ClaimRecord>>;

    /// Fetch a claim by id. Returns `StoreError::NotFound` if absent.
    async fn get(&self, id: &ClaimId) -> StoreResult<ClaimRecord>;

    /// Fetch a claim by normalized poster hash.
    async fn get_by_hash(&self, poster_hash: &str) -> StoreResult<ClaimRecord>;

    /// Persist a sealed claim.
    async fn save(&self, claim: NewClaim) -> StoreResult<ClaimRecord>;
}

#[async_trait]
impl<T: ClaimStore + ?Sized> ClaimStore for std::sync::Arc<T> {
    async fn list(&self) -> StoreResult<Vec<ClaimRecord>> {
        (**self).list().await
    }

    async fn get(&self, id: &ClaimId) -> StoreResult<ClaimRecord> {
        (**self).get(id).await
    }

    async fn get_by_hash(&self, poster_hash: &str) -> StoreResult<ClaimRecord> {
        (**self).get_by_hash(poster_hash).await
    }

    async fn save(&self, claim: NewClaim) -> StoreResult<ClaimRecord> {
        (**self).save(claim).await
    }
}
