use issue_relay::{BranchType, PublishTarget};
use serde::Deserialize;

use crate::error_handler::{AppError, AppResult};

/// Body of the analysis-server webhook fired after a project analysis.
///
/// Only the fields needed to locate the pull request are decoded.
#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    /// Analysis task status ("SUCCESS", ...). Informational only.
    #[serde(default)]
    pub status: Option<String>,
    pub project: WebhookProject,
    pub branch: WebhookBranch,
}

#[derive(Debug, Deserialize)]
pub struct WebhookProject {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct WebhookBranch {
    pub name: String,
    /// "BRANCH" or "PULL_REQUEST"; absent means a plain branch.
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl WebhookRequest {
    pub fn from_slice(body: &[u8]) -> AppResult<Self> {
        serde_json::from_slice(body)
            .map_err(|e| AppError::bad_request(format!("invalid webhook payload: {e}")))
    }

    /// Validates identifiers and turns the event into a unit of work.
    pub fn into_target(self) -> AppResult<PublishTarget> {
        let project = self.project.key.trim();
        if project.is_empty() {
            return Err(AppError::invalid_field("project.key", "project key is empty"));
        }

        let branch = self.branch.name.trim();
        if branch.is_empty() {
            return Err(AppError::invalid_field("branch.name", "branch name is empty"));
        }

        Ok(PublishTarget::new(
            project,
            branch,
            BranchType::from_sonar(&self.branch.kind),
        ))
    }
}
