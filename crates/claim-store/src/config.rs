//! Claims API configuration.

use serde::{Deserialize, Serialize};

/// Claims API used when neither an override nor the environment names one.
pub const DEFAULT_STORE_URL: &str = "http://127.0.0.1:8788/api";

/// Environment variable consulted for the claims API base URL.
pub const STORE_URL_ENV: &str = "CLAIMSEAL_STORE_URL";

/// Environment variable consulted for the claims API bearer token.
pub const STORE_TOKEN_ENV: &str = "CLAIMSEAL_STORE_TOKEN";

/// Claims API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    /// Bearer token (saves are rejected with `AuthRequired` without one)
    pub token: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::new(DEFAULT_STORE_URL)
    }
}

impl StoreConfig {
    /// Create config for a specific API
    pub fn new(base_url: &str) -> Self {
        StoreConfig {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Resolve from optional overrides and the process environment.
    pub fn resolve(override_url: Option<&str>, override_token: Option<&str>) -> Self {
        let env_url = std::env::var(STORE_URL_ENV).ok();
        let env_token = std::env::var(STORE_TOKEN_ENV).ok();
        Self::resolve_with(
            override_url,
            env_url.as_deref(),
            override_token,
            env_token.as_deref(),
        )
    }

    /// Resolve from explicit inputs: override, then environment, then default.
    pub fn resolve_with(
        override_url: Option<&str>,
        env_url: Option<&str>,
        override_token: Option<&str>,
        env_token: Option<&str>,
    ) -> Self {
        let url = first_present(override_url, env_url).unwrap_or(DEFAULT_STORE_URL);
        let mut config = Self::new(url);
        if let Some(token) = first_present(override_token, env_token) {
            config = config.with_token(token);
        }
        config
    }

    /// Set authentication token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn first_present<'a>(a: Option<&'a str>, b: Option<&'a str>) -> Option<&'a str> {
    [a, b].into_iter().flatten().find(|s| !s.trim().is_empty())
}
