//! Crate-wide error hierarchy for scm-review.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type ScmResult<T> = Result<T, ScmError>;

/// Root error type for the scm-review crate.
#[derive(Debug, Error)]
pub enum ScmError {
    /// Source-control provider (GitHub) related failure.
    #[error(transparent)]
    Provider(#[from] ScmProviderError),

    /// Unified diff parsing failure.
    #[error(transparent)]
    DiffParse(#[from] DiffParseError),

    /// Issues were given but none of them landed inside the pull request diff.
    ///
    /// Usually a path-normalization or line-mapping mismatch; retrying does not help.
    #[error("no relevant issues found ({issue_count} issues outside the diff)")]
    NoRelevantIssues { issue_count: usize },

    /// Input validation errors (bad PR key, unparsable PR url, empty review, etc.).
    #[error("validation error: {0}")]
    Validation(String),
}

/// Provider-specific error used inside the provider layer.
#[derive(Debug, Error)]
pub enum ScmProviderError {
    /// Unauthorized (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden (HTTP 403).
    #[error("forbidden")]
    Forbidden,

    /// Not found (HTTP 404).
    #[error("not found")]
    NotFound,

    /// Rate limited (HTTP 429).
    #[error("rate limited")]
    RateLimited {
        /// Optional `Retry-After` hint in seconds when available.
        retry_after_secs: Option<u64>,
    },

    /// Validation failed on the provider side (HTTP 422), e.g. a comment line outside the diff.
    #[error("unprocessable entity")]
    Unprocessable,

    /// Gateway / server error (HTTP 5xx).
    #[error("server error: status {0}")]
    Server(u16),

    /// Other HTTP status (non-2xx) not covered by specific variants.
    #[error("http status error: status {0}")]
    HttpStatus(u16),

    /// Timeout at transport level.
    #[error("timeout")]
    Timeout,

    /// Network/transport failure without HTTP status (DNS/connect/reset).
    #[error("network error: {0}")]
    Network(String),

    /// Unexpected/invalid shape of provider response.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Unified diff parser errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiffParseError {
    /// Hunk header could not be parsed or had invalid counters.
    #[error("line {line}: invalid hunk header '{header}'")]
    InvalidHunkHeader { line: usize, header: String },

    /// A hunk appeared before any `---`/`+++` file header.
    #[error("line {0}: hunk without file header")]
    HunkWithoutFile(usize),

    /// `---` header not followed by a `+++` header.
    #[error("line {0}: missing '+++' header")]
    MissingNewFileHeader(usize),

    /// Hunk body ended before its announced line counts were consumed.
    #[error("line {0}: truncated hunk body")]
    TruncatedHunk(usize),

    /// Non-empty input with no file header at all.
    #[error("input is not a unified diff")]
    NotADiff,
}

// ===== Conversions for `?` ergonomics at the crate root =====

impl From<reqwest::Error> for ScmError {
    fn from(e: reqwest::Error) -> Self {
        ScmError::Provider(ScmProviderError::from(e))
    }
}

// ===== Mapping from reqwest::Error into ScmProviderError =====

impl From<reqwest::Error> for ScmProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return ScmProviderError::Timeout;
        }

        if let Some(status) = e.status() {
            let code = status.as_u16();
            return match code {
                401 => ScmProviderError::Unauthorized,
                403 => ScmProviderError::Forbidden,
                404 => ScmProviderError::NotFound,
                422 => ScmProviderError::Unprocessable,
                429 => ScmProviderError::RateLimited {
                    retry_after_secs: None,
                },
                500..=599 => ScmProviderError::Server(code),
                _ => ScmProviderError::HttpStatus(code),
            };
        }

        if e.is_decode() {
            return ScmProviderError::InvalidResponse(e.to_string());
        }

        ScmProviderError::Network(e.to_string())
    }
}
