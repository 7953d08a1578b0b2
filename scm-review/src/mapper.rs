//! Issue -> review comment mapping against a [`DiffIndex`].

use sonar_client::Issue;
use tracing::debug;

use crate::diff_index::DiffIndex;
use crate::errors::{ScmError, ScmResult};
use crate::git_providers::types::{CommentSide, ReviewComment};

/// Turns issues into positioned comments, keeping input order.
///
/// An issue yields one comment per hunk of its file that covers its line;
/// issues on files outside the diff or on lines outside every hunk are
/// dropped. Overlapping hunks produce duplicate comments.
///
/// Returns [`ScmError::NoRelevantIssues`] when `issues` is non-empty but
/// nothing could be placed.
pub fn map_issues(
    issues: &[Issue],
    index: &DiffIndex,
    root: &str,
) -> ScmResult<Vec<ReviewComment>> {
    let mut comments = Vec::new();

    for issue in issues {
        let path = issue.file_path();
        let Some(hunks) = index.hunks_for(path) else {
            debug!(issue = %issue.key, path = %path, "file not part of the diff");
            continue;
        };

        let before = comments.len();
        for hunk in hunks.iter().filter(|h| h.covers(issue.line)) {
            debug!(
                issue = %issue.key,
                path = %path,
                line = issue.line,
                hunk_new_start = hunk.new_start,
                "issue inside hunk"
            );
            comments.push(ReviewComment {
                path: path.to_string(),
                body: issue.markdown_message(root),
                side: CommentSide::Right,
                line: issue.line,
            });
        }

        if comments.len() == before {
            debug!(issue = %issue.key, path = %path, line = issue.line, "line outside every hunk");
        }
    }

    if comments.is_empty() && !issues.is_empty() {
        return Err(ScmError::NoRelevantIssues {
            issue_count: issues.len(),
        });
    }

    Ok(comments)
}
