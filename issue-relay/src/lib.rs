//! Publish orchestrator: SonarQube issues -> one GitHub review per cycle.
//!
//! A cycle for a [`PublishTarget`] runs these steps, each logged at `DEBUG`
//! with its elapsed time:
//!
//! 1) **resolve_pr**: by key for pull-request analyses, by branch name otherwise
//! 2) **list_issues**: issues of the PR, reduced to open and not yet published
//! 3) **publish_review**: fetch diff, map issues onto hunks, submit one review
//! 4) **tag_published**: bulk-tag the issues so later cycles skip them
//!
//! Nothing to publish ends the cycle successfully. Any failing step aborts the
//! cycle with a [`RelayError`] naming the step; callers retry the whole cycle.

pub mod config;
pub mod errors;
pub mod target;

use std::time::Instant;

use scm_review::{ScmError, SourceControl, publish_issues_review};
use sonar_client::{
    BulkActionResponse, IssueTracker, Issues, PullRequest, STATUS_OPEN, TAG_PUBLISHED,
};
use tracing::{debug, info};

pub use config::{ConfigError, PublishConfig, Settings};
pub use errors::{PublishStage, RelayError, RelayResult, UpstreamError};
pub use target::{BranchType, PublishTarget};

/// How a successful cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// No open, unpublished issue on the pull request.
    NothingToPublish { pr_key: String },

    /// A review went out.
    Published {
        pr_key: String,
        issues: usize,
        comments: usize,
        /// Bulk-tag result; `None` when tagging is disabled.
        tagged: Option<BulkActionResponse>,
    },
}

/// Finds the pull request for `target` and returns its pending issues.
///
/// Pending means status `OPEN` and no `published` tag.
pub async fn resolve_pending<T: IssueTracker>(
    tracker: &T,
    target: &PublishTarget,
) -> RelayResult<(PullRequest, Issues)> {
    let t0 = Instant::now();
    debug!(cycle = %target, "resolve_pr: start");
    let pr = match target.branch_type {
        BranchType::PullRequest => tracker.find_pr_for_key(&target.project, &target.branch).await,
        BranchType::Branch => tracker.find_pr_for_branch(&target.project, &target.branch).await,
    }
    .map_err(|e| RelayError::stage(PublishStage::ResolvePr, target, e))?;
    debug!(
        "resolve_pr: pr={} url={} ({} ms)",
        pr.key,
        pr.url,
        t0.elapsed().as_millis()
    );

    let t1 = Instant::now();
    let all = tracker
        .list_issues_for_pr(&target.project, &pr.key)
        .await
        .map_err(|e| RelayError::stage(PublishStage::ListIssues, target, e))?;
    let pending = all
        .filter_by_status(STATUS_OPEN)
        .filter_out_by_tag(TAG_PUBLISHED);
    debug!(
        "list_issues: total={} pending={} ({} ms)",
        all.len(),
        pending.len(),
        t1.elapsed().as_millis()
    );

    Ok((pr, pending))
}

/// Runs publish cycles against one tracker and one source-control host.
///
/// Both collaborators are expected to be cheap to share across concurrent cycles.
#[derive(Debug, Clone)]
pub struct IssuePublisher<T, S> {
    tracker: T,
    scm: S,
    config: PublishConfig,
}

impl<T: IssueTracker, S: SourceControl> IssuePublisher<T, S> {
    pub fn new(tracker: T, scm: S, config: PublishConfig) -> Self {
        Self {
            tracker,
            scm,
            config,
        }
    }

    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// One full cycle, bounded by `config.cycle_timeout` when set.
    pub async fn publish(&self, target: &PublishTarget) -> RelayResult<PublishOutcome> {
        let t0 = Instant::now();
        info!(cycle = %target, "publish cycle started");

        let outcome = match self.config.cycle_timeout {
            Some(limit) => tokio::time::timeout(limit, self.run_cycle(target))
                .await
                .map_err(|_| RelayError::Timeout {
                    project: target.project.clone(),
                    branch: target.branch.clone(),
                    timeout: limit,
                })??,
            None => self.run_cycle(target).await?,
        };

        info!(
            cycle = %target,
            outcome = ?outcome,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "publish cycle finished"
        );
        Ok(outcome)
    }

    async fn run_cycle(&self, target: &PublishTarget) -> RelayResult<PublishOutcome> {
        let (pr, pending) = resolve_pending(&self.tracker, target).await?;

        if pending.is_empty() {
            debug!("publish_review: skipped, nothing pending");
            return Ok(PublishOutcome::NothingToPublish { pr_key: pr.key });
        }

        self.publish_pending(target, &pr, &pending).await
    }

    /// Steps 3 and 4 for issues already resolved by [`resolve_pending`].
    pub async fn publish_pending(
        &self,
        target: &PublishTarget,
        pr: &PullRequest,
        pending: &Issues,
    ) -> RelayResult<PublishOutcome> {
        let t2 = Instant::now();
        let comments = publish_issues_review(
            &self.scm,
            pr,
            pending.as_slice(),
            self.tracker.root_url(),
            self.config.request_changes,
        )
        .await
        .map_err(|e| match e {
            ScmError::NoRelevantIssues { issue_count } => RelayError::NoRelevantIssues {
                project: target.project.clone(),
                branch: target.branch.clone(),
                issue_count,
            },
            other => RelayError::stage(PublishStage::PublishReview, target, other),
        })?;
        debug!(
            "publish_review: comments={} request_changes={} ({} ms)",
            comments,
            self.config.request_changes,
            t2.elapsed().as_millis()
        );

        let tagged = if self.config.mark_as_published {
            let t3 = Instant::now();
            let res = self
                .tracker
                .tag_issues(pending.as_slice(), TAG_PUBLISHED)
                .await
                .map_err(|e| RelayError::stage(PublishStage::TagPublished, target, e))?;
            debug!("tag_published: done ({} ms)", t3.elapsed().as_millis());
            info!(
                cycle = %target,
                marked = res.success,
                ignored = res.ignored,
                failed = res.failures,
                "mark as published result"
            );
            Some(res)
        } else {
            debug!("tag_published: disabled");
            None
        };

        Ok(PublishOutcome::Published {
            pr_key: pr.key.clone(),
            issues: pending.len(),
            comments,
            tagged,
        })
    }
}
