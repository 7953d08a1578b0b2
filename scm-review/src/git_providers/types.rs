//! Provider-agnostic review model.

use serde::{Deserialize, Serialize};

/// Supported source-control providers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProviderKind {
    GitHub,
}

/// Diff side a comment is anchored to. Issues always refer to the new file.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommentSide {
    #[default]
    Right,
    Left,
}

/// A positioned comment inside a pull-request review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewComment {
    pub path: String,
    /// Markdown body.
    pub body: String,
    pub side: CommentSide,
    pub line: u32,
}

/// Review verdict: block the merge or just leave feedback.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewVerdict {
    RequestChanges,
    Comment,
}

impl ReviewVerdict {
    pub fn from_request_changes(request_changes: bool) -> Self {
        if request_changes {
            ReviewVerdict::RequestChanges
        } else {
            ReviewVerdict::Comment
        }
    }
}

/// One atomic review: preamble, verdict and every comment of the cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewSubmission {
    pub body: String,
    pub event: ReviewVerdict,
    pub comments: Vec<ReviewComment>,
}

/// Repository coordinates of a pull request on the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_serializes_to_review_payload() {
        let review = ReviewSubmission {
            body: "hi".into(),
            event: ReviewVerdict::RequestChanges,
            comments: vec![ReviewComment {
                path: "pkg/a.go".into(),
                body: "msg".into(),
                side: CommentSide::Right,
                line: 61,
            }],
        };

        let json = serde_json::to_value(&review).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "body": "hi",
                "event": "REQUEST_CHANGES",
                "comments": [{"path": "pkg/a.go", "body": "msg", "side": "RIGHT", "line": 61}]
            })
        );
    }

    #[test]
    fn verdict_from_flag() {
        assert_eq!(ReviewVerdict::from_request_changes(true), ReviewVerdict::RequestChanges);
        assert_eq!(ReviewVerdict::from_request_changes(false), ReviewVerdict::Comment);
        assert_eq!(serde_json::to_string(&ReviewVerdict::Comment).unwrap(), "\"COMMENT\"");
    }
}
