//! In-memory renderer stub (testing and offline use)
//!
//! `StubRenderer` satisfies the `Renderer` contract without a network.
//! By default it is deterministic and honors its inputs: hashes are
//! SHA-256 over the serialized snapshot. It can also be frozen to a
//! fixed answer (a renderer serving stale output), scripted with a fixed
//! `/verify` response, or made to fail.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::RenderError;
use crate::hash::hashes_equal;
use crate::protocol::{RenderMetadata, RenderResponse, Renderer, VerifyRequest, VerifyResponse};
use crate::snapshot::Snapshot;
use crate::RenderResult;

/// Protocol version the stub reports in render metadata.
pub const STUB_PROTOCOL_VERSION: &str = "1.2.0";

#[derive(Debug, Clone)]
enum Behavior {
    Deterministic,
    Frozen {
        poster: String,
        animation: Option<String>,
    },
}

/// Calls observed by a `StubRenderer`.
#[derive(Debug, Clone, PartialEq)]
pub enum StubCall {
    Render(Snapshot),
    Verify(VerifyRequest),
}

/// Scriptable, deterministic renderer.
#[derive(Debug)]
pub struct StubRenderer {
    behavior: Behavior,
    verify_response: Option<VerifyResponse>,
    failure: Option<RenderError>,
    calls: Mutex<Vec<StubCall>>,
}

impl Default for StubRenderer {
    fn default() -> Self {
        Self::deterministic()
    }
}

impl StubRenderer {
    /// Hashes derived from the snapshot content.
    pub fn deterministic() -> Self {
        StubRenderer {
            behavior: Behavior::Deterministic,
            verify_response: None,
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with the same hashes, whatever the input.
    pub fn frozen(poster: &str, animation: Option<&str>) -> Self {
        StubRenderer {
            behavior: Behavior::Frozen {
                poster: poster.to_string(),
                animation: animation.map(str::to_string),
            },
            ..Self::deterministic()
        }
    }

    /// Answer every `/verify` call with this response.
    pub fn with_verify_response(mut self, response: VerifyResponse) -> Self {
        self.verify_response = Some(response);
        self
    }

    /// Fail every call with this error.
    pub fn failing(mut self, error: RenderError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Poster and animation hashes the deterministic stub produces.
    pub fn hashes_for(snapshot: &Snapshot) -> (String, Option<String>) {
        let body = serde_json::to_vec(snapshot).unwrap_or_default();
        let poster = digest(b"poster", &body);
        let looping = snapshot.execution.is_loop || snapshot.execution.frames > 1;
        let animation = looping.then(|| digest(b"animation", &body));
        (poster, animation)
    }

    pub fn calls(&self) -> Vec<StubCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn record(&self, call: StubCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn produce(&self, snapshot: &Snapshot) -> (String, Option<String>) {
        match &self.behavior {
            Behavior::Deterministic => Self::hashes_for(snapshot),
            Behavior::Frozen { poster, animation } => (poster.clone(), animation.clone()),
        }
    }
}

fn digest(domain: &[u8], body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update([0u8]);
    hasher.update(body);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

#[async_trait]
impl Renderer for StubRenderer {
    async fn render(&self, snapshot: &Snapshot) -> RenderResult<RenderResponse> {
        self.record(StubCall::Render(snapshot.clone()));
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let (poster, animation) = self.produce(snapshot);
        Ok(RenderResponse {
            poster_hash: Some(poster),
            image_hash: None,
            animation_hash: animation,
            mime: "image/png".to_string(),
            output_base64: String::new(),
            metadata: RenderMetadata {
                renderer_version: Some(format!("stub-{}", env!("CARGO_PKG_VERSION"))),
                protocol_version: Some(STUB_PROTOCOL_VERSION.to_string()),
                extra: Default::default(),
            },
        })
    }

    async fn verify(&self, request: &VerifyRequest) -> RenderResult<VerifyResponse> {
        self.record(StubCall::Verify(request.clone()));
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if let Some(scripted) = &self.verify_response {
            return Ok(scripted.clone());
        }

        let (poster, animation) = self.produce(&request.snapshot);
        let poster_ok = request
            .expected_poster()
            .map(|e| hashes_equal(e, &poster))
            .unwrap_or(false);
        let animation_ok = match (&request.expected_animation_hash, &animation) {
            (Some(expected), Some(computed)) => hashes_equal(expected, computed),
            (None, _) => true,
            (Some(_), None) => false,
        };

        let looping = request.expected_animation_hash.is_some();
        Ok(VerifyResponse {
            verified: Some(poster_ok && animation_ok),
            computed_hash: (!looping).then(|| poster.clone()),
            computed_poster_hash: looping.then_some(poster),
            computed_animation_hash: animation.filter(|_| looping),
            extra: Default::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Execution;

    fn snap(seed: i64) -> Snapshot {
        Snapshot::new("draw()", seed, vec![10.0; 10], Execution::still())
    }

    #[tokio::test]
    async fn deterministic_stub_honors_inputs() {
        let stub = StubRenderer::deterministic();
        let a = stub.render(&snap(1)).await.unwrap();
        let b = stub.render(&snap(1)).await.unwrap();
        let c = stub.render(&snap(2)).await.unwrap();
        assert_eq!(a.poster(), b.poster());
        assert_ne!(a.poster(), c.poster());
        assert!(a.animation().is_none());
        assert_eq!(stub.call_count(), 3);
    }

    #[tokio::test]
    async fn looping_snapshot_gets_animation_hash() {
        let stub = StubRenderer::deterministic();
        let mut s = snap(1);
        s.execution = Execution::looping(60);
        let resp = stub.render(&s).await.unwrap();
        assert!(resp.animation().is_some());
    }

    #[tokio::test]
    async fn verify_accepts_any_prefix_notation() {
        let stub = StubRenderer::deterministic();
        let (poster, _) = StubRenderer::hashes_for(&snap(5));
        let doubled = format!("SHA256:{}", poster.to_uppercase());
        let resp = stub
            .verify(&VerifyRequest::still(snap(5), doubled))
            .await
            .unwrap();
        assert_eq!(resp.verified, Some(true));
    }

    #[tokio::test]
    async fn verify_matches_previous_render() {
        let stub = StubRenderer::deterministic();
        let (poster, _) = StubRenderer::hashes_for(&snap(5));
        let resp = stub
            .verify(&VerifyRequest::still(snap(5), poster.to_uppercase()))
            .await
            .unwrap();
        assert_eq!(resp.verified, Some(true));
        assert_eq!(resp.computed_poster(), Some(poster.as_str()));
    }

    #[tokio::test]
    async fn frozen_stub_ignores_inputs() {
        let stub = StubRenderer::frozen("sha256:aaa", None);
        let a = stub.render(&snap(1)).await.unwrap();
        let b = stub.render(&snap(2)).await.unwrap();
        assert_eq!(a.poster(), b.poster());
    }

    #[tokio::test]
    async fn failing_stub_records_then_fails() {
        let stub = StubRenderer::deterministic()
            .failing(RenderError::MalformedResponse("truncated".to_string()));
        assert!(stub.render(&snap(1)).await.is_err());
        assert_eq!(stub.calls(), vec![StubCall::Render(snap(1))]);
    }
}
