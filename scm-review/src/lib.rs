//! Pull-request side of the relay: diff indexing, issue-to-comment mapping
//! and review submission through a [`SourceControl`] provider.

pub mod diff_index;
pub mod errors;
pub mod git_providers;
pub mod mapper;
pub mod publish;

pub use diff_index::{DiffFile, DiffIndex, Hunk};
pub use errors::{DiffParseError, ScmError, ScmProviderError, ScmResult};
pub use git_providers::{
    CommentSide, ProviderClient, ProviderConfig, ProviderKind, ReviewComment, ReviewSubmission,
    ReviewVerdict, SourceControl,
};
pub use mapper::map_issues;
pub use publish::{build_review, publish_issues_review, publish_review, review_preamble};
