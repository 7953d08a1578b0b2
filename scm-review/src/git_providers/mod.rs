//! Source-control facade.
//!
//! [`SourceControl`] is the capability the publish pipeline depends on:
//! fetch the raw diff of a pull request and submit one review. Concrete
//! providers are wrapped in the [`ProviderClient`] enum so callers stay
//! generic without boxing futures.

pub mod github;
pub mod types;
pub use types::*;

use std::future::Future;
use std::time::Duration;

use sonar_client::PullRequest;
use tracing::debug;

use crate::errors::ScmResult;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// What the publish pipeline needs from a source-control host.
pub trait SourceControl: Send + Sync {
    /// Raw unified diff of the pull request.
    fn resolve_diff(&self, pr: &PullRequest) -> impl Future<Output = ScmResult<String>> + Send;

    /// Submits `review` as a single atomic review on the pull request.
    fn publish_review(
        &self,
        pr: &PullRequest,
        review: &ReviewSubmission,
    ) -> impl Future<Output = ScmResult<()>> + Send;
}

/// Runtime configuration for any provider client.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// API base, e.g. "https://api.github.com".
    pub base_api: String,
    /// Access token for the provider (PAT or app token).
    pub token: String,
}

/// Concrete provider client with enum dispatch.
#[derive(Debug, Clone)]
pub enum ProviderClient {
    GitHub(github::GitHubClient),
}

impl ProviderClient {
    /// Constructs a concrete provider client from generic configuration.
    ///
    /// The underlying HTTP client is shared and configured with a stable
    /// user agent (GitHub rejects requests without one).
    pub fn from_config(cfg: ProviderConfig) -> ScmResult<Self> {
        debug!(
            "Initializing provider client: kind={:?}, base_api={}",
            cfg.kind, cfg.base_api
        );

        let client = reqwest::Client::builder()
            .user_agent("sqpr/0.1")
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let client = match cfg.kind {
            ProviderKind::GitHub => {
                ProviderClient::GitHub(github::GitHubClient::new(client, cfg.base_api, cfg.token))
            }
        };

        Ok(client)
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::GitHub(_) => ProviderKind::GitHub,
        }
    }
}

impl SourceControl for ProviderClient {
    async fn resolve_diff(&self, pr: &PullRequest) -> ScmResult<String> {
        debug!("Fetching diff: provider={:?}, pr={}", self.kind(), pr.key);

        match self {
            Self::GitHub(c) => c.get_diff(pr).await,
        }
    }

    async fn publish_review(&self, pr: &PullRequest, review: &ReviewSubmission) -> ScmResult<()> {
        debug!(
            "Publishing review: provider={:?}, pr={}, event={:?}, comments={}",
            self.kind(),
            pr.key,
            review.event,
            review.comments.len()
        );

        match self {
            Self::GitHub(c) => c.create_review(pr, review).await,
        }
    }
}
