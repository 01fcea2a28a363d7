//! Renderer wire protocol and the `Renderer` abstraction.
//!
//! Two endpoints are consumed:
//! - `POST /render` takes a `Snapshot` and returns the content hashes
//! - `POST /verify` takes a `Snapshot` plus expected hashes and returns
//!   the hashes the renderer computed
//!
//! Field names follow the renderer's camelCase JSON. Older renderers
//! answer `/render` with `imageHash` instead of `posterHash`; both are
//! accepted.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::snapshot::Snapshot;
use crate::RenderResult;

/// Renderer provenance attached to every render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
    /// Anything else the renderer reports
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response body of `POST /render`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_hash: Option<String>,
    #[serde(default)]
    pub mime: String,
    #[serde(default)]
    pub output_base64: String,
    #[serde(default)]
    pub metadata: RenderMetadata,
}

impl RenderResponse {
    /// The still-image hash, whichever field name the renderer used.
    pub fn poster(&self) -> Option<&str> {
        non_empty(self.poster_hash.as_deref()).or_else(|| non_empty(self.image_hash.as_deref()))
    }

    pub fn animation(&self) -> Option<&str> {
        non_empty(self.animation_hash.as_deref())
    }
}

/// Request body of `POST /verify`.
///
/// Still snapshots send `expectedHash`; looping snapshots send the
/// poster/animation pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_poster_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_animation_hash: Option<String>,
}

impl VerifyRequest {
    pub fn still(snapshot: Snapshot, expected_hash: impl Into<String>) -> Self {
        VerifyRequest {
            snapshot,
            expected_hash: Some(expected_hash.into()),
            expected_poster_hash: None,
            expected_animation_hash: None,
        }
    }

    pub fn looping(
        snapshot: Snapshot,
        expected_poster_hash: impl Into<String>,
        expected_animation_hash: impl Into<String>,
    ) -> Self {
        VerifyRequest {
            snapshot,
            expected_hash: None,
            expected_poster_hash: Some(expected_poster_hash.into()),
            expected_animation_hash: Some(expected_animation_hash.into()),
        }
    }

    /// The expected poster hash, whichever shape the request carries.
    pub fn expected_poster(&self) -> Option<&str> {
        self.expected_poster_hash
            .as_deref()
            .or(self.expected_hash.as_deref())
    }
}

/// Response body of `POST /verify`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    /// The renderer's own verdict. Informational only: callers compare
    /// the computed hashes themselves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_poster_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_animation_hash: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VerifyResponse {
    pub fn computed_poster(&self) -> Option<&str> {
        non_empty(self.computed_poster_hash.as_deref())
            .or_else(|| non_empty(self.computed_hash.as_deref()))
    }

    pub fn computed_animation(&self) -> Option<&str> {
        non_empty(self.computed_animation_hash.as_deref())
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// A deterministic renderer.
///
/// Guarantees expected of implementations:
/// - identical snapshots produce identical hashes
/// - failures are returned as classified `RenderError`s, never panics
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render a snapshot and return its content hashes.
    async fn render(&self, snapshot: &Snapshot) -> RenderResult<RenderResponse>;

    /// Re-render a snapshot and report the hashes it produced.
    async fn verify(&self, request: &VerifyRequest) -> RenderResult<VerifyResponse>;
}

#[async_trait]
impl<T: Renderer + ?Sized> Renderer for std::sync::Arc<T> {
    async fn render(&self, snapshot: &Snapshot) -> RenderResult<RenderResponse> {
        (**self).render(snapshot).await
    }

    async fn verify(&self, request: &VerifyRequest) -> RenderResult<VerifyResponse> {
        (**self).verify(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Execution;

    fn snapshot() -> Snapshot {
        Snapshot::new("draw()", 7, vec![1.0; 10], Execution::looping(60))
    }

    #[test]
    fn render_response_accepts_legacy_image_hash() {
        let resp: RenderResponse = serde_json::from_value(serde_json::json!({
            "imageHash": "sha256:abc",
            "mime": "image/png",
            "outputBase64": "",
            "metadata": { "rendererVersion": "1.4.0", "protocolVersion": "1.2", "node": "v20" }
        }))
        .unwrap();
        assert_eq!(resp.poster(), Some("sha256:abc"));
        assert_eq!(resp.animation(), None);
        assert_eq!(resp.metadata.protocol_version.as_deref(), Some("1.2"));
        assert_eq!(resp.metadata.extra["node"], "v20");
    }

    #[test]
    fn empty_poster_hash_falls_back_to_image_hash() {
        let resp = RenderResponse {
            poster_hash: Some(String::new()),
            image_hash: Some("def".to_string()),
            ..Default::default()
        };
        assert_eq!(resp.poster(), Some("def"));
    }

    #[test]
    fn looping_verify_request_flattens_snapshot() {
        let req = VerifyRequest::looping(snapshot(), "p", "a");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["code"], "draw()");
        assert_eq!(json["execution"]["loop"], true);
        assert_eq!(json["expectedPosterHash"], "p");
        assert_eq!(json["expectedAnimationHash"], "a");
        assert!(json.get("expectedHash").is_none());
        assert_eq!(req.expected_poster(), Some("p"));
    }

    #[test]
    fn still_verify_request_sends_expected_hash() {
        let mut snap = snapshot();
        snap.execution = Execution::still();
        let json = serde_json::to_value(VerifyRequest::still(snap, "h")).unwrap();
        assert_eq!(json["expectedHash"], "h");
        assert!(json.get("expectedPosterHash").is_none());
    }

    #[test]
    fn verify_response_prefers_poster_specific_field() {
        let resp: VerifyResponse = serde_json::from_value(serde_json::json!({
            "verified": false,
            "computedHash": "one",
            "computedPosterHash": "two",
            "computedAnimationHash": "three",
            "elapsedMs": 12
        }))
        .unwrap();
        assert_eq!(resp.computed_poster(), Some("two"));
        assert_eq!(resp.computed_animation(), Some("three"));
        assert_eq!(resp.verified, Some(false));
        assert_eq!(resp.extra["elapsedMs"], 12);
    }
}
