//! HTTP claims API client

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{classify_status, StoreError};
use crate::storage_traits::{ClaimId, ClaimRecord, ClaimStore, NewClaim, StoreResult};

/// Claim store reached over HTTP
///
/// Endpoints: `GET /claims`, `GET /claims/{id}`,
/// `GET /claims/by-hash/{hash}`, `POST /claims`.
pub struct HttpClaimStore {
    config: StoreConfig,
    http_client: reqwest::Client,
}

impl HttpClaimStore {
    /// Create a new claims API client
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(format!("claimseal-claim-store/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))?;

        Ok(HttpClaimStore {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> StoreResult<Self> {
        Self::new(StoreConfig::resolve(None, None))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// `{base}/claims/{segments..}`, each segment percent-encoded.
    fn claim_url(&self, segments: &[&str]) -> StoreResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.config.endpoint("claims"))
            .map_err(|e| StoreError::Config(format!("invalid claims URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| {
                StoreError::Config(format!("claims URL cannot take a path: {}", self.config.base_url))
            })?
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn read<T: DeserializeOwned>(
        &self,
        key: &str,
        request: reqwest::RequestBuilder,
    ) -> StoreResult<T> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(key = %key, status = status.as_u16(), "claims API returned an error status");
            return Err(classify_status(status.as_u16(), key, &text));
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl ClaimStore for HttpClaimStore {
    async fn list(&self) -> StoreResult<Vec<ClaimRecord>> {
        let url = self.config.endpoint("claims");
        debug!(url = %url, "listing claims");
        self.read("claims", self.http_client.get(&url)).await
    }

    async fn get(&self, id: &ClaimId) -> StoreResult<ClaimRecord> {
        let url = self.claim_url(&[id.0.as_str()])?;
        self.read(&id.0, self.http_client.get(url)).await
    }

    async fn get_by_hash(&self, poster_hash: &str) -> StoreResult<ClaimRecord> {
        let url = self.claim_url(&["by-hash", poster_hash])?;
        self.read(poster_hash, self.http_client.get(url)).await
    }

    async fn save(&self, claim: NewClaim) -> StoreResult<ClaimRecord> {
        let url = self.config.endpoint("claims");
        info!(poster_hash = %claim.poster_hash, "saving sealed claim");
        let key = claim.poster_hash.clone();
        self.read(&key, self.http_client.post(&url).json(&claim))
            .await
    }
}
