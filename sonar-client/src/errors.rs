//! Crate-wide error hierarchy for sonar-client.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type SonarResult<T> = Result<T, SonarError>;

/// Root error type for the sonar-client crate.
#[derive(Debug, Error)]
pub enum SonarError {
    /// Unauthorized (HTTP 401). Usually a wrong or revoked API key.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden (HTTP 403).
    #[error("forbidden")]
    Forbidden,

    /// Not found (HTTP 404).
    #[error("not found")]
    NotFound,

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

    /// Response body could not be decoded into the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// No pull request in the project listing matched the requested key/branch.
    #[error("pull request not found for project '{project}' ({selector})")]
    PullRequestNotFound { project: String, selector: String },

    /// Client construction problems (bad root url, etc.).
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for SonarError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return SonarError::Timeout;
        }

        if let Some(status) = e.status() {
            let code = status.as_u16();
            return match code {
                401 => SonarError::Unauthorized,
                403 => SonarError::Forbidden,
                404 => SonarError::NotFound,
                500..=599 => SonarError::Server(code),
                _ => SonarError::HttpStatus(code),
            };
        }

        if e.is_decode() {
            return SonarError::InvalidResponse(e.to_string());
        }

        SonarError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for SonarError {
    fn from(e: serde_json::Error) -> Self {
        SonarError::InvalidResponse(e.to_string())
    }
}
