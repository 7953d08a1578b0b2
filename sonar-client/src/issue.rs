//! Issues as reported by `GET /api/issues/search`, plus the pure filters the
//! relay applies before mapping them onto a diff.

use serde::{Deserialize, Serialize};

/// A single static-analysis finding.
///
/// Only the fields the relay needs are decoded; everything else in the
/// SonarQube payload is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub key: String,
    #[serde(default)]
    pub project: String,
    /// Server-qualified path, e.g. `myproject:pkg/file.go`.
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub severity: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub rule: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// 1-based line; project-level issues carry no line and decode as 0.
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub message: String,
}

impl Issue {
    /// Repository-relative path: the component with its `"<project>:"` prefix removed.
    pub fn file_path(&self) -> &str {
        self.component
            .strip_prefix(self.project.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
            .unwrap_or(&self.component)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn type_emoji(&self) -> &'static str {
        match self.kind.as_str() {
            "BUG" => ":bug:",
            "CODE_SMELL" => ":biohazard:",
            "VULNERABILITY" => ":key:",
            _ => ":thought_balloon:",
        }
    }

    pub fn severity_emoji(&self) -> &'static str {
        match self.severity.as_str() {
            "BLOCKER" => ":no_entry:",
            "CRITICAL" => ":bangbang:",
            "MAJOR" => ":exclamation:",
            "MINOR" => ":warning:",
            _ => ":information_source:",
        }
    }

    /// Link to the rule description on the SonarQube instance rooted at `root`.
    pub fn rule_link(&self, root: &str) -> String {
        format!(
            "{}/coding_rules?open={}&rule_key={}",
            root.trim_end_matches('/'),
            self.rule,
            self.rule
        )
    }

    /// Markdown body used for the review comment.
    ///
    /// `:bug::bangbang: CRITICAL: My message ([go:S1234](<root>/coding_rules?...))`
    pub fn markdown_message(&self, root: &str) -> String {
        format!(
            "{}{} {}: {} ([{}]({}))",
            self.type_emoji(),
            self.severity_emoji(),
            self.severity,
            self.message,
            self.rule,
            self.rule_link(root)
        )
    }
}

/// Ordered collection of issues.
///
/// Filters never mutate the receiver; they return a new collection that keeps
/// the relative order of the survivors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issues {
    #[serde(default)]
    pub issues: Vec<Issue>,
}

impl Issues {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    /// Keeps issues whose status equals `status` exactly (case-sensitive).
    pub fn filter_by_status(&self, status: &str) -> Issues {
        self.retain_cloned(|issue| issue.status == status)
    }

    /// Drops every issue carrying `tag`.
    pub fn filter_out_by_tag(&self, tag: &str) -> Issues {
        self.retain_cloned(|issue| !issue.has_tag(tag))
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Issue> {
        self.issues.iter()
    }

    pub fn as_slice(&self) -> &[Issue] {
        &self.issues
    }

    fn retain_cloned(&self, keep: impl Fn(&Issue) -> bool) -> Issues {
        Issues {
            issues: self.issues.iter().filter(|i| keep(i)).cloned().collect(),
        }
    }
}

impl From<Vec<Issue>> for Issues {
    fn from(issues: Vec<Issue>) -> Self {
        Self { issues }
    }
}

impl<'a> IntoIterator for &'a Issues {
    type Item = &'a Issue;
    type IntoIter = std::slice::Iter<'a, Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.iter()
    }
}
