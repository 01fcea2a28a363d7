//! Process-wide configuration: where the renderer and the claim store live.
//!
//! Every setting resolves once at start with the same precedence:
//! explicit override (CLI flag), then environment, then built-in default.

use std::time::Duration;

use claim_store::{HttpClaimStore, StoreConfig, StoreResult, STORE_TOKEN_ENV, STORE_URL_ENV};
use render_client::{HttpRenderer, RenderResult, RendererConfig, RENDERER_URL_ENV};

/// Values supplied explicitly, typically from command-line flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub renderer_url: Option<String>,
    pub renderer_timeout: Option<Duration>,
    pub store_url: Option<String>,
    pub store_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClaimsealConfig {
    pub renderer: RendererConfig,
    pub store: StoreConfig,
}

impl ClaimsealConfig {
    /// Resolve against the process environment.
    pub fn resolve(overrides: &ConfigOverrides) -> Self {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary environment lookup.
    pub fn resolve_with<F>(overrides: &ConfigOverrides, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_renderer = env(RENDERER_URL_ENV);
        let env_store = env(STORE_URL_ENV);
        let env_token = env(STORE_TOKEN_ENV);

        let mut renderer = RendererConfig::resolve_with(
            overrides.renderer_url.as_deref(),
            env_renderer.as_deref(),
        );
        if let Some(timeout) = overrides.renderer_timeout {
            renderer = renderer.with_timeout(Some(timeout));
        }
        let store = StoreConfig::resolve_with(
            overrides.store_url.as_deref(),
            env_store.as_deref(),
            overrides.store_token.as_deref(),
            env_token.as_deref(),
        );
        ClaimsealConfig { renderer, store }
    }

    pub fn renderer_client(&self) -> RenderResult<HttpRenderer> {
        HttpRenderer::new(self.renderer.clone())
    }

    pub fn store_client(&self) -> StoreResult<HttpClaimStore> {
        HttpClaimStore::new(self.store.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_flags_beat_environment() {
        let overrides = ConfigOverrides {
            renderer_url: Some("http://flag:1".to_string()),
            store_token: Some("flag-token".to_string()),
            ..Default::default()
        };
        let config = ClaimsealConfig::resolve_with(
            &overrides,
            env(&[
                (RENDERER_URL_ENV, "http://env:2"),
                (STORE_URL_ENV, "http://env:3/api/"),
                (STORE_TOKEN_ENV, "env-token"),
            ]),
        );
        assert_eq!(config.renderer.base_url, "http://flag:1");
        assert_eq!(config.store.base_url, "http://env:3/api");
        assert_eq!(config.store.token.as_deref(), Some("flag-token"));
    }

    #[test]
    fn test_defaults_without_inputs() {
        let config = ClaimsealConfig::resolve_with(&ConfigOverrides::default(), env(&[]));
        assert_eq!(config.renderer, RendererConfig::default());
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn test_timeout_override() {
        let overrides = ConfigOverrides {
            renderer_timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let config = ClaimsealConfig::resolve_with(&overrides, env(&[]));
        assert_eq!(config.renderer.timeout, Some(Duration::from_secs(5)));
        assert!(config.renderer_client().is_ok());
    }
}
