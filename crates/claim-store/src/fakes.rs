//! In-memory fake for `ClaimStore` (testing only)
//!
//! `MemoryClaimStore` follows the same acceptance rules as the real API
//! (poster hash and title required, one claim per poster hash) and can be
//! told to reject upcoming saves to exercise the auth/validation paths.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StoreError;
use crate::storage_traits::*;

/// In-memory claim store backed by a `Vec<ClaimRecord>`.
#[derive(Debug, Default)]
pub struct MemoryClaimStore {
    claims: Mutex<Vec<ClaimRecord>>,
    injected: Mutex<VecDeque<StoreError>>,
    save_attempts: Mutex<usize>,
}

impl MemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `save` fail with `err`. Queued failures are consumed
    /// in order, one per save attempt.
    pub fn reject_next_save(&self, err: StoreError) {
        self.injected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(err);
    }

    /// Number of `save` calls seen so far, successful or not.
    pub fn save_attempts(&self) -> usize {
        *self
            .save_attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.claims
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ClaimStore for MemoryClaimStore {
    async fn list(&self) -> StoreResult<Vec<ClaimRecord>> {
        let claims = self.claims.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(claims.iter().rev().cloned().collect())
    }

    async fn get(&self, id: &ClaimId) -> StoreResult<ClaimRecord> {
        let claims = self.claims.lock().unwrap_or_else(PoisonError::into_inner);
        claims
            .iter()
            .find(|c| &c.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { key: id.0.clone() })
    }

    async fn get_by_hash(&self, poster_hash: &str) -> StoreResult<ClaimRecord> {
        let claims = self.claims.lock().unwrap_or_else(PoisonError::into_inner);
        claims
            .iter()
            .find(|c| c.poster_hash == poster_hash)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                key: poster_hash.to_string(),
            })
    }

    async fn save(&self, claim: NewClaim) -> StoreResult<ClaimRecord> {
        *self
            .save_attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner) += 1;

        if let Some(err) = self
            .injected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
        {
            return Err(err);
        }

        if claim.poster_hash.trim().is_empty() {
            return Err(StoreError::ValidationRejected {
                message: "posterHash is required".to_string(),
            });
        }
        if claim.title.trim().is_empty() {
            return Err(StoreError::ValidationRejected {
                message: "title is required".to_string(),
            });
        }

        let mut claims = self.claims.lock().unwrap_or_else(PoisonError::into_inner);
        if claims.iter().any(|c| c.poster_hash == claim.poster_hash) {
            return Err(StoreError::ValidationRejected {
                message: format!(
                    "a claim with poster hash {} is already sealed",
                    claim.poster_hash
                ),
            });
        }

        let record = ClaimRecord {
            id: ClaimId::new(),
            poster_hash: claim.poster_hash,
            animation_hash: claim.animation_hash,
            title: claim.title,
            claim_type: claim.claim_type,
            bundle: claim.bundle,
            created_at: Utc::now(),
        };
        claims.push(record.clone());
        Ok(record)
    }
}
