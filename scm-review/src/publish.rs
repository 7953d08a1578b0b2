//! Review assembly and submission.

use sonar_client::{Issue, PullRequest};
use tracing::{debug, info};

use crate::diff_index::DiffIndex;
use crate::errors::{ScmError, ScmResult};
use crate::git_providers::SourceControl;
use crate::git_providers::types::{ReviewComment, ReviewSubmission, ReviewVerdict};
use crate::mapper::map_issues;

/// Human-readable review body naming the comment count.
pub fn review_preamble(comment_count: usize) -> String {
    format!(
        ":wave: Hey, I added {} comments about your changes, please take a look :slightly_smiling_face:",
        comment_count
    )
}

/// Bundles `comments` into one review with the preamble and verdict.
pub fn build_review(comments: Vec<ReviewComment>, request_changes: bool) -> ReviewSubmission {
    ReviewSubmission {
        body: review_preamble(comments.len()),
        event: ReviewVerdict::from_request_changes(request_changes),
        comments,
    }
}

/// Submits all `comments` as a single review on `pr`.
///
/// Either the whole batch is posted or an error is returned; an empty batch
/// is refused without calling the provider.
pub async fn publish_review<S: SourceControl>(
    scm: &S,
    pr: &PullRequest,
    comments: Vec<ReviewComment>,
    request_changes: bool,
) -> ScmResult<()> {
    if comments.is_empty() {
        return Err(ScmError::Validation(
            "refusing to submit a review without comments".into(),
        ));
    }

    let review = build_review(comments, request_changes);
    scm.publish_review(pr, &review).await?;

    info!(
        pr = %pr.key,
        event = ?review.event,
        count = review.comments.len(),
        "review published"
    );
    Ok(())
}

/// Fetches the diff, maps `issues` onto it and publishes the review.
///
/// Returns the number of comments posted. The diff index lives only for this call.
pub async fn publish_issues_review<S: SourceControl>(
    scm: &S,
    pr: &PullRequest,
    issues: &[Issue],
    root: &str,
    request_changes: bool,
) -> ScmResult<usize> {
    let raw = scm.resolve_diff(pr).await?;
    let index = DiffIndex::build(&raw)?;
    debug!(pr = %pr.key, files = index.len(), issues = issues.len(), "diff indexed");

    let comments = map_issues(issues, &index, root)?;
    let count = comments.len();
    publish_review(scm, pr, comments, request_changes).await?;

    Ok(count)
}
