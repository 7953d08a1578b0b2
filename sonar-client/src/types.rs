//! Wire types returned by the SonarQube web API.

use serde::{Deserialize, Serialize};

/// Tag attached to issues whose review comment was already posted.
pub const TAG_PUBLISHED: &str = "published";

/// Issue status kept by the relay.
pub const STATUS_OPEN: &str = "OPEN";

/// Branch type reported by SonarQube webhooks for pull-request analyses.
pub const BRANCH_TYPE_PULL_REQUEST: &str = "PULL_REQUEST";

/// A pull request known to SonarQube.
///
/// `key` is the provider-side PR number as a string ("3"), `url` points to the
/// pull request page on the source-control host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub key: String,
    #[serde(rename = "branch")]
    pub branch_name: String,
    #[serde(default)]
    pub url: String,
}

/// Response of `GET /api/project_pull_requests/list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectPullRequests {
    #[serde(rename = "pullRequests", default)]
    pub pull_requests: Vec<PullRequest>,
}

impl ProjectPullRequests {
    /// First pull request whose key equals `key`.
    pub fn find_by_key(&self, key: &str) -> Option<&PullRequest> {
        self.pull_requests.iter().find(|pr| pr.key == key)
    }

    /// First pull request opened from `branch`.
    pub fn find_by_branch(&self, branch: &str) -> Option<&PullRequest> {
        self.pull_requests.iter().find(|pr| pr.branch_name == branch)
    }
}

/// Response of `POST /api/issues/bulk_change`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkActionResponse {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub success: u32,
    #[serde(default)]
    pub ignored: u32,
    #[serde(default)]
    pub failures: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"{"pullRequests":[{"key":"3","title":"Feat/newtest","branch":"feat/newtest","base":"feat/mvp","url":"https://github.com/myorg/myproject/pull/3","target":"feat/mvp"},{"key":"2","title":"test PR","branch":"feat/test","base":"feat/mvp","url":"https://github.com/myorg/myproject/pull/2","target":"feat/mvp"}]}"#;

    #[test]
    fn listing_ignores_unknown_fields() {
        let prs: ProjectPullRequests = serde_json::from_str(LISTING).unwrap();
        assert_eq!(prs.pull_requests.len(), 2);
        assert_eq!(prs.pull_requests[0].branch_name, "feat/newtest");
        assert_eq!(prs.pull_requests[1].url, "https://github.com/myorg/myproject/pull/2");
    }

    #[test]
    fn find_by_key_and_branch() {
        let prs: ProjectPullRequests = serde_json::from_str(LISTING).unwrap();

        assert_eq!(prs.find_by_key("2").map(|pr| pr.branch_name.as_str()), Some("feat/test"));
        assert_eq!(prs.find_by_branch("feat/newtest").map(|pr| pr.key.as_str()), Some("3"));
        assert!(prs.find_by_key("99").is_none());
        assert!(prs.find_by_branch("main").is_none());
    }

    #[test]
    fn empty_listing_decodes() {
        let prs: ProjectPullRequests = serde_json::from_str("{}").unwrap();
        assert!(prs.pull_requests.is_empty());
    }
}
