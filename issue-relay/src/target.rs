//! What a publish cycle works on.

use std::fmt;

use sonar_client::BRANCH_TYPE_PULL_REQUEST;

/// How `PublishTarget::branch` identifies the pull request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BranchType {
    /// A plain branch name; the PR is found by scanning the project's PRs.
    #[default]
    Branch,
    /// The "branch" is already the PR key.
    PullRequest,
}

impl BranchType {
    /// Reads the `branch.type` value of a SonarQube webhook.
    pub fn from_sonar(value: &str) -> Self {
        if value == BRANCH_TYPE_PULL_REQUEST {
            BranchType::PullRequest
        } else {
            BranchType::Branch
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BranchType::Branch => "BRANCH",
            BranchType::PullRequest => BRANCH_TYPE_PULL_REQUEST,
        }
    }
}

impl fmt::Display for BranchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (project, branch|key, type) tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublishTarget {
    pub project: String,
    pub branch: String,
    pub branch_type: BranchType,
}

impl PublishTarget {
    pub fn new(
        project: impl Into<String>,
        branch: impl Into<String>,
        branch_type: BranchType,
    ) -> Self {
        Self {
            project: project.into(),
            branch: branch.into(),
            branch_type,
        }
    }
}

impl fmt::Display for PublishTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.project, self.branch, self.branch_type)
    }
}
