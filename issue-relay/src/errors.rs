//! Error taxonomy of a publish cycle.

use std::fmt;
use std::time::Duration;

use scm_review::ScmError;
use services::Retryable;
use sonar_client::SonarError;
use thiserror::Error;

use crate::target::PublishTarget;

/// Convenient alias for crate-wide results.
pub type RelayResult<T> = Result<T, RelayError>;

/// Step of the publish cycle that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStage {
    ResolvePr,
    ListIssues,
    PublishReview,
    TagPublished,
}

impl fmt::Display for PublishStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PublishStage::ResolvePr => "resolve_pr",
            PublishStage::ListIssues => "list_issues",
            PublishStage::PublishReview => "publish_review",
            PublishStage::TagPublished => "tag_published",
        };
        f.write_str(name)
    }
}

/// Collaborator failure behind a stage error.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Analysis server (SonarQube).
    #[error(transparent)]
    Sonar(#[from] SonarError),

    /// Source-control host (GitHub).
    #[error(transparent)]
    Scm(#[from] ScmError),
}

/// Root error type for the issue-relay crate.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A step of the cycle failed; the whole cycle is what gets retried.
    #[error("{stage} failed for {project}/{branch}: {source}")]
    Stage {
        stage: PublishStage,
        project: String,
        branch: String,
        #[source]
        source: UpstreamError,
    },

    /// Every pending issue fell outside the pull-request diff.
    #[error("no relevant issues found for {project}/{branch} ({issue_count} issues outside the diff)")]
    NoRelevantIssues {
        project: String,
        branch: String,
        issue_count: usize,
    },

    /// The cycle exceeded its time budget.
    #[error("publish cycle for {project}/{branch} timed out after {timeout:?}")]
    Timeout {
        project: String,
        branch: String,
        timeout: Duration,
    },
}

impl RelayError {
    /// Wraps a collaborator failure with the stage and tuple it happened in.
    pub fn stage(
        stage: PublishStage,
        target: &PublishTarget,
        source: impl Into<UpstreamError>,
    ) -> Self {
        RelayError::Stage {
            stage,
            project: target.project.clone(),
            branch: target.branch.clone(),
            source: source.into(),
        }
    }

    /// Stage that failed, when the error comes from a collaborator call.
    pub fn failed_stage(&self) -> Option<PublishStage> {
        match self {
            RelayError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl Retryable for RelayError {
    /// Upstream failures and timeouts are retried. A diff/line mismatch and
    /// malformed identifiers give the same answer on every attempt.
    fn is_retryable(&self) -> bool {
        match self {
            RelayError::NoRelevantIssues { .. } => false,
            RelayError::Timeout { .. } => true,
            RelayError::Stage { source, .. } => match source {
                UpstreamError::Scm(ScmError::Validation(_)) => false,
                UpstreamError::Scm(ScmError::NoRelevantIssues { .. }) => false,
                UpstreamError::Sonar(SonarError::Config(_)) => false,
                _ => true,
            },
        }
    }
}
