//! SonarQube access for the relay.
//!
//! The [`IssueTracker`] trait is the seam the publish pipeline talks to;
//! [`SonarClient`] is the HTTP implementation.

pub mod client;
pub mod errors;
pub mod issue;
pub mod types;

use std::future::Future;

pub use client::SonarClient;
pub use errors::{SonarError, SonarResult};
pub use issue::{Issue, Issues};
pub use types::{
    BRANCH_TYPE_PULL_REQUEST, BulkActionResponse, ProjectPullRequests, PullRequest, STATUS_OPEN,
    TAG_PUBLISHED,
};

/// Read/write access to the static-analysis server.
pub trait IssueTracker: Send + Sync {
    /// Base URL used to build rule links in comments.
    fn root_url(&self) -> &str;

    fn project_pull_requests(
        &self,
        project: &str,
    ) -> impl Future<Output = SonarResult<ProjectPullRequests>> + Send;

    fn list_issues_for_pr(
        &self,
        project: &str,
        pr_key: &str,
    ) -> impl Future<Output = SonarResult<Issues>> + Send;

    /// Adds `tag` to every issue and moves them to "in review".
    fn tag_issues(
        &self,
        issues: &[Issue],
        tag: &str,
    ) -> impl Future<Output = SonarResult<BulkActionResponse>> + Send;

    fn find_pr_for_key(
        &self,
        project: &str,
        key: &str,
    ) -> impl Future<Output = SonarResult<PullRequest>> + Send {
        async move {
            let prs = self.project_pull_requests(project).await?;
            prs.find_by_key(key)
                .cloned()
                .ok_or_else(|| SonarError::PullRequestNotFound {
                    project: project.to_string(),
                    selector: format!("key={key}"),
                })
        }
    }

    fn find_pr_for_branch(
        &self,
        project: &str,
        branch: &str,
    ) -> impl Future<Output = SonarResult<PullRequest>> + Send {
        async move {
            let prs = self.project_pull_requests(project).await?;
            prs.find_by_branch(branch)
                .cloned()
                .ok_or_else(|| SonarError::PullRequestNotFound {
                    project: project.to_string(),
                    selector: format!("branch={branch}"),
                })
        }
    }
}
