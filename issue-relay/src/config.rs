//! Process settings and per-cycle publish options.
//!
//! Everything is read once at startup into explicit structs; the publish
//! pipeline never looks at the environment itself.

use std::time::Duration;

use scm_review::{ProviderConfig, ProviderKind};
use thiserror::Error;

pub const ENV_SONAR_ROOT_URL: &str = "SONAR_ROOT_URL";
pub const ENV_SONAR_API_KEY: &str = "SONAR_API_KEY";
pub const ENV_GH_TOKEN: &str = "GH_TOKEN";
pub const ENV_WEBHOOK_SECRET: &str = "WEBHOOK_SECRET";
pub const ENV_GITHUB_API_URL: &str = "GITHUB_API_URL";

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Configuration and setup errors. Fatal at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Required variable missing or empty.
    #[error("{0} environment variable is missing")]
    MissingVar(&'static str),
}

/// Secrets and endpoints taken from the environment.
#[derive(Clone)]
pub struct Settings {
    pub sonar_root_url: String,
    pub sonar_api_key: String,
    pub gh_token: Option<String>,
    pub webhook_secret: Option<String>,
    pub github_api_url: String,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("sonar_root_url", &self.sonar_root_url)
            .field("sonar_api_key", &"***")
            .field("gh_token", &self.gh_token.as_ref().map(|_| "***"))
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "***"))
            .field("github_api_url", &self.github_api_url)
            .finish()
    }
}

impl Settings {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from any key lookup. Empty values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            sonar_root_url: get(ENV_SONAR_ROOT_URL)
                .ok_or(ConfigError::MissingVar(ENV_SONAR_ROOT_URL))?,
            sonar_api_key: get(ENV_SONAR_API_KEY)
                .ok_or(ConfigError::MissingVar(ENV_SONAR_API_KEY))?,
            gh_token: get(ENV_GH_TOKEN),
            webhook_secret: get(ENV_WEBHOOK_SECRET),
            github_api_url: get(ENV_GITHUB_API_URL)
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
        })
    }

    pub fn require_gh_token(&self) -> Result<&str, ConfigError> {
        self.gh_token
            .as_deref()
            .ok_or(ConfigError::MissingVar(ENV_GH_TOKEN))
    }

    pub fn require_webhook_secret(&self) -> Result<&str, ConfigError> {
        self.webhook_secret
            .as_deref()
            .ok_or(ConfigError::MissingVar(ENV_WEBHOOK_SECRET))
    }

    /// GitHub provider settings; needs `GH_TOKEN`.
    pub fn provider_config(&self) -> Result<ProviderConfig, ConfigError> {
        Ok(ProviderConfig {
            kind: ProviderKind::GitHub,
            base_api: self.github_api_url.clone(),
            token: self.require_gh_token()?.to_string(),
        })
    }
}

/// Per-cycle behaviour passed into the publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishConfig {
    /// Submit `REQUEST_CHANGES` instead of a plain `COMMENT` review.
    pub request_changes: bool,
    /// Tag issues as published after the review went out.
    pub mark_as_published: bool,
    /// Upper bound for one whole cycle. `None` relies on per-request HTTP timeouts.
    pub cycle_timeout: Option<Duration>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            request_changes: false,
            mark_as_published: true,
            cycle_timeout: None,
        }
    }
}
