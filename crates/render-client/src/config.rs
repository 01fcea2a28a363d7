//! Renderer endpoint configuration.
//!
//! The base URL is resolved once at process start with a fixed precedence:
//! explicit override, then `CLAIMSEAL_RENDERER_URL`, then the built-in
//! default.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Renderer used when neither an override nor the environment names one.
pub const DEFAULT_RENDERER_URL: &str = "http://127.0.0.1:8787";

/// Environment variable consulted for the renderer base URL.
pub const RENDERER_URL_ENV: &str = "CLAIMSEAL_RENDERER_URL";

/// Renderer client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    /// Whole-request timeout; `None` leaves it to the transport
    pub timeout: Option<Duration>,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        RendererConfig::new(DEFAULT_RENDERER_URL)
    }
}

impl RendererConfig {
    /// Create config for a specific renderer
    pub fn new(base_url: &str) -> Self {
        RendererConfig {
            base_url: trim_base(base_url),
            timeout: Some(Duration::from_secs(60)),
            user_agent: format!("claimseal-render-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Resolve from an optional override and the process environment.
    pub fn resolve(override_url: Option<&str>) -> Self {
        let env_url = std::env::var(RENDERER_URL_ENV).ok();
        Self::resolve_with(override_url, env_url.as_deref())
    }

    /// Resolve from explicit inputs. Blank values are treated as absent.
    pub fn resolve_with(override_url: Option<&str>, env_url: Option<&str>) -> Self {
        let chosen = [override_url, env_url]
            .into_iter()
            .flatten()
            .find(|u| !u.trim().is_empty())
            .unwrap_or(DEFAULT_RENDERER_URL);
        Self::new(chosen)
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Absolute URL for an endpoint path such as `"render"`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn trim_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_override_wins() {
        let config =
            RendererConfig::resolve_with(Some("https://r.example.com/"), Some("http://env:1"));
        assert_eq!(config.base_url, "https://r.example.com");
    }

    #[test]
    fn environment_beats_default() {
        let config = RendererConfig::resolve_with(None, Some("http://env:1"));
        assert_eq!(config.base_url, "http://env:1");
    }

    #[test]
    fn blank_override_is_ignored() {
        let config = RendererConfig::resolve_with(Some("  "), None);
        assert_eq!(config.base_url, DEFAULT_RENDERER_URL);
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = RendererConfig::new("http://localhost:9000/");
        assert_eq!(config.endpoint("/verify"), "http://localhost:9000/verify");
        assert_eq!(config.endpoint("render"), "http://localhost:9000/render");
    }
}
