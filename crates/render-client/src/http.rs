//! HTTP renderer client

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::RendererConfig;
use crate::error::{classify_status, RenderError};
use crate::protocol::{RenderResponse, Renderer, VerifyRequest, VerifyResponse};
use crate::snapshot::Snapshot;
use crate::RenderResult;

/// Renderer reached over HTTP
pub struct HttpRenderer {
    config: RendererConfig,
    http_client: reqwest::Client,
}

impl HttpRenderer {
    /// Create a new renderer client
    pub fn new(config: RendererConfig) -> RenderResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| RenderError::Config(e.to_string()))?;

        Ok(HttpRenderer {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> RenderResult<Self> {
        Self::new(RendererConfig::resolve(None))
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> RenderResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.config.endpoint(path);
        debug!(url = %url, "posting to renderer");

        let response = self.http_client.post(&url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "renderer returned an error status");
            return Err(classify_status(status.as_u16(), &text));
        }

        serde_json::from_str(&text).map_err(|e| RenderError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, snapshot: &Snapshot) -> RenderResult<RenderResponse> {
        self.post("render", snapshot).await
    }

    async fn verify(&self, request: &VerifyRequest) -> RenderResult<VerifyResponse> {
        self.post("verify", request).await
    }
}
