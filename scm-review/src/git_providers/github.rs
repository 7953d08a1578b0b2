//! GitHub provider (REST v3): raw PR diff and review creation.
//!
//! Endpoints used:
//!   * GET  /repos/{owner}/{repo}/pulls/{number}   (Accept: application/vnd.github.v3.diff)
//!   * POST /repos/{owner}/{repo}/pulls/{number}/reviews

use reqwest::{Client, Url};
use sonar_client::PullRequest;
use tracing::debug;

use crate::errors::{ScmError, ScmResult};
use crate::git_providers::types::{PullRequestRef, ReviewSubmission};

/// Owner/repository pair taken from a pull-request URL path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubPath {
    pub owner: String,
    /// Empty when the URL only names an owner.
    pub repo: String,
}

/// GitHub HTTP client wrapper.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_api: String, // "https://api.github.com"
    token: String,
}

impl GitHubClient {
    /// Constructs a GitHub client with a shared HTTP instance and auth token.
    pub fn new(http: Client, base_api: String, token: String) -> Self {
        let base_api = base_api.trim_end_matches('/').to_string();
        debug!("Creating GitHubClient with base_api={}", base_api);
        Self {
            http,
            base_api,
            token,
        }
    }

    /// Fetches the unified diff of the pull request.
    pub async fn get_diff(&self, pr: &PullRequest) -> ScmResult<String> {
        let target = pull_request_ref(pr)?;
        let url = format!(
            "{}/repos/{}/{}/pulls/{}",
            self.base_api, target.owner, target.repo, target.number
        );
        debug!("GitHub get_diff: {}", url);

        let diff = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github.v3.diff")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(diff)
    }

    /// Creates one review carrying every comment of the submission.
    pub async fn create_review(
        &self,
        pr: &PullRequest,
        review: &ReviewSubmission,
    ) -> ScmResult<()> {
        let target = pull_request_ref(pr)?;
        let url = format!(
            "{}/repos/{}/{}/pulls/{}/reviews",
            self.base_api, target.owner, target.repo, target.number
        );
        debug!(
            "GitHub create_review: url={}, event={:?}, count={}",
            url,
            review.event,
            review.comments.len()
        );

        self.http
            .post(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .json(review)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

/// Resolves owner, repo and number of a SonarQube pull request.
///
/// The number is the PR key; owner and repo come from the PR url.
pub fn pull_request_ref(pr: &PullRequest) -> ScmResult<PullRequestRef> {
    let number = pr.key.trim().parse::<u64>().map_err(|_| {
        ScmError::Validation(format!("pull request key '{}' is not a number", pr.key))
    })?;

    let path = parse_github_path(&pr.url)?;
    if path.repo.is_empty() {
        return Err(ScmError::Validation(format!(
            "pull request url '{}' has no repository",
            pr.url
        )));
    }

    Ok(PullRequestRef {
        owner: path.owner,
        repo: path.repo,
        number,
    })
}

/// Splits `https://github.com/<owner>/<repo>/...` into owner and repo.
///
/// A URL naming only an owner yields an empty repo; a URL without any path
/// segment is rejected.
pub fn parse_github_path(raw: &str) -> ScmResult<GitHubPath> {
    let url = Url::parse(raw)
        .map_err(|e| ScmError::Validation(format!("invalid pull request url '{}': {}", raw, e)))?;

    let mut segments = url.path_segments().into_iter().flatten();
    let owner = segments.next().unwrap_or_default();
    if owner.is_empty() {
        return Err(ScmError::Validation(format!(
            "no directories specified in '{}'",
            raw
        )));
    }
    let repo = segments.next().unwrap_or_default();

    Ok(GitHubPath {
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}
