//! Claim-Store: Sealed Claim Persistence for claimseal
//!
//! This crate is the persistence collaborator. Sealed claims live behind a
//! network API; this crate provides the `ClaimStore` abstraction over it,
//! an HTTP implementation, and an in-memory fake.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: faithful representation of the store's rejections. A save that
//! fails with "authentication required" or "validation rejected" must be
//! retryable by the caller without redoing any render work.

mod config;
mod error;
pub mod fakes;
mod http;
pub mod storage_traits;

pub use config::{StoreConfig, DEFAULT_STORE_URL, STORE_TOKEN_ENV, STORE_URL_ENV};
pub use error::{classify_status, StoreError};
pub use http::HttpClaimStore;
pub use storage_traits::{ClaimId, ClaimRecord, ClaimStore, NewClaim, StoreResult};
