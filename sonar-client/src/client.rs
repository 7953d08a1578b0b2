//! SonarQube HTTP client (web API, basic auth with the token as username).
//!
//! Endpoints used:
//!   * GET  /api/project_pull_requests/list?project={project}
//!   * GET  /api/issues/search?pullRequest={key}&componentKeys={project}
//!   * POST /api/issues/bulk_change?issues={k1,k2}&add_tags={tag}&do_transition=setinreview

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::IssueTracker;
use crate::errors::{SonarError, SonarResult};
use crate::issue::{Issue, Issues};
use crate::types::{BulkActionResponse, ProjectPullRequests};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin SonarQube client. Cheap to clone; the connection pool is shared.
#[derive(Debug, Clone)]
pub struct SonarClient {
    http: Client,
    root: String,
    api_key: String,
}

impl SonarClient {
    /// Builds a client for the instance at `root` (e.g. "https://sonar.example.com").
    pub fn new(root: impl Into<String>, api_key: impl Into<String>) -> SonarResult<Self> {
        let root = root.into().trim_end_matches('/').to_string();
        if root.is_empty() {
            return Err(SonarError::Config("empty SonarQube root url".into()));
        }

        let http = Client::builder()
            .user_agent("sqpr/0.1")
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        debug!("Creating SonarClient with root={}", root);

        Ok(Self {
            http,
            root,
            api_key: api_key.into(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> SonarResult<T> {
        let url = format!("{}{}", self.root, path);
        debug!("Sonar GET {} {:?}", url, query);

        let body = self
            .http
            .get(url)
            .query(query)
            .basic_auth(&self.api_key, Some(""))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        Ok(serde_json::from_slice(&body)?)
    }
}

impl IssueTracker for SonarClient {
    fn root_url(&self) -> &str {
        &self.root
    }

    async fn project_pull_requests(&self, project: &str) -> SonarResult<ProjectPullRequests> {
        self.get_json("/api/project_pull_requests/list", &[("project", project)])
            .await
    }

    async fn list_issues_for_pr(&self, project: &str, pr_key: &str) -> SonarResult<Issues> {
        self.get_json(
            "/api/issues/search",
            &[("pullRequest", pr_key), ("componentKeys", project)],
        )
        .await
    }

    async fn tag_issues(&self, issues: &[Issue], tag: &str) -> SonarResult<BulkActionResponse> {
        if issues.is_empty() {
            debug!("tag_issues: nothing to tag");
            return Ok(BulkActionResponse::default());
        }

        let keys = issues
            .iter()
            .map(|i| i.key.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let url = format!("{}/api/issues/bulk_change", self.root);
        debug!("Sonar POST {} issues={} tag={}", url, issues.len(), tag);

        let body = self
            .http
            .post(url)
            .query(&[
                ("issues", keys.as_str()),
                ("add_tags", tag),
                ("do_transition", "setinreview"),
            ])
            .basic_auth(&self.api_key, Some(""))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TAG_PUBLISHED;
    use mockito::{Matcher, Server};

    const LISTING: &str = r#"{"pullRequests":[{"key":"3","title":"Feat/newtest","branch":"feat/newtest","base":"feat/mvp","status":{"qualityGateStatus":"ERROR","bugs":2,"vulnerabilities":0,"codeSmells":0},"analysisDate":"2021-12-04T15:44:18+0000","url":"https://github.com/myorg/myproject/pull/3","target":"feat/mvp"},{"key":"2","title":"test PR","branch":"feat/test","base":"feat/mvp","status":{"qualityGateStatus":"ERROR","bugs":1,"vulnerabilities":0,"codeSmells":2},"analysisDate":"2021-12-03T18:10:59+0000","url":"https://github.com/myorg/myproject/pull/2","target":"feat/mvp"}]}"#;

    // "myapikey:" in base64
    const BASIC_AUTH: &str = "Basic bXlhcGlrZXk6";

    #[test]
    fn new_trims_root_and_rejects_empty() {
        let client = SonarClient::new("https://my-root/", "apiKey").unwrap();
        assert_eq!(client.root_url(), "https://my-root");

        assert!(matches!(
            SonarClient::new("", "apiKey"),
            Err(SonarError::Config(_))
        ));
    }

    #[tokio::test]
    async fn project_pull_requests_decodes_listing() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/project_pull_requests/list")
            .match_query(Matcher::UrlEncoded("project".into(), "myproject".into()))
            .match_header("authorization", BASIC_AUTH)
            .with_status(200)
            .with_body(LISTING)
            .create_async()
            .await;

        let sonar = SonarClient::new(server.url(), "myapikey").unwrap();
        let prs = sonar.project_pull_requests("myproject").await.unwrap();
        mock.assert_async().await;

        assert_eq!(prs.pull_requests.len(), 2);
        assert_eq!(prs.pull_requests[0].branch_name, "feat/newtest");
        assert_eq!(prs.pull_requests[0].key, "3");
        assert_eq!(prs.pull_requests[1].key, "2");
    }

    #[tokio::test]
    async fn find_pr_for_key_and_branch() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/project_pull_requests/list")
            .match_query(Matcher::Any)
            .with_body(LISTING)
            .expect_at_least(2)
            .create_async()
            .await;

        let sonar = SonarClient::new(server.url(), "myapikey").unwrap();

        let by_key = sonar.find_pr_for_key("myproject", "2").await.unwrap();
        assert_eq!(by_key.branch_name, "feat/test");
        assert_eq!(by_key.url, "https://github.com/myorg/myproject/pull/2");

        let by_branch = sonar
            .find_pr_for_branch("myproject", "feat/newtest")
            .await
            .unwrap();
        assert_eq!(by_branch.key, "3");
    }

    #[tokio::test]
    async fn find_pr_reports_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/project_pull_requests/list")
            .match_query(Matcher::Any)
            .with_body(LISTING)
            .expect_at_least(2)
            .create_async()
            .await;

        let sonar = SonarClient::new(server.url(), "myapikey").unwrap();

        let err = sonar.find_pr_for_key("myproject", "42").await.unwrap_err();
        assert!(matches!(err, SonarError::PullRequestNotFound { .. }));

        let err = sonar
            .find_pr_for_branch("myproject", "main")
            .await
            .unwrap_err();
        assert!(matches!(err, SonarError::PullRequestNotFound { .. }));
    }

    #[tokio::test]
    async fn list_issues_for_pr_sends_pr_and_component() {
        let body = r#"{"total":2,"issues":[{"key":"AX2GHjk1-Wk2ioy15Nrv","rule":"go:S1763","severity":"MAJOR","component":"myorg_myproject:pkg/newwrong.go","project":"myorg_myproject","line":5,"status":"OPEN","message":"Refactor this piece of code to not have any dead code after this \"return\".","tags":["cwe","unused","published"],"type":"BUG"},{"key":"AX2Bhc31-Wk2ioy15L4-","rule":"go:S1763","severity":"MAJOR","component":"myorg_myproject:pkg/verywrong.go","project":"myorg_myproject","status":"CLOSED","message":"dead code","tags":["cwe","unused"],"type":"BUG"}]}"#;

        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/issues/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("pullRequest".into(), "3".into()),
                Matcher::UrlEncoded("componentKeys".into(), "myorg_myproject".into()),
            ]))
            .with_body(body)
            .create_async()
            .await;

        let sonar = SonarClient::new(server.url(), "myapikey").unwrap();
        let issues = sonar
            .list_issues_for_pr("myorg_myproject", "3")
            .await
            .unwrap();
        mock.assert_async().await;

        assert_eq!(issues.len(), 2);
        let first = &issues.issues[0];
        assert_eq!(first.key, "AX2GHjk1-Wk2ioy15Nrv");
        assert_eq!(first.component, "myorg_myproject:pkg/newwrong.go");
        assert_eq!(first.severity, "MAJOR");
        assert_eq!(first.rule, "go:S1763");
        assert_eq!(first.kind, "BUG");
        assert_eq!(first.status, "OPEN");
        assert_eq!(first.line, 5);
        assert_eq!(first.tags, vec!["cwe", "unused", "published"]);
        assert_eq!(
            first.message,
            r#"Refactor this piece of code to not have any dead code after this "return"."#
        );
    }

    #[tokio::test]
    async fn tag_issues_posts_bulk_change() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/issues/bulk_change")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded(
                    "issues".into(),
                    "AX2GHjk1-Wk2ioy15Nrv,AX2GHjk1-Wk2ioy15Nrw".into(),
                ),
                Matcher::UrlEncoded("add_tags".into(), TAG_PUBLISHED.into()),
                Matcher::UrlEncoded("do_transition".into(), "setinreview".into()),
            ]))
            .match_header("authorization", BASIC_AUTH)
            .with_body(r#"{"total":2,"success":2,"ignored":0,"failures":0}"#)
            .create_async()
            .await;

        let sonar = SonarClient::new(server.url(), "myapikey").unwrap();
        let issues = vec![
            Issue { key: "AX2GHjk1-Wk2ioy15Nrv".into(), ..Issue::default() },
            Issue { key: "AX2GHjk1-Wk2ioy15Nrw".into(), ..Issue::default() },
        ];
        let res = sonar.tag_issues(&issues, TAG_PUBLISHED).await.unwrap();
        mock.assert_async().await;

        assert_eq!(
            res,
            BulkActionResponse { total: 2, success: 2, ignored: 0, failures: 0 }
        );
    }

    #[tokio::test]
    async fn tag_issues_skips_empty_batch() {
        let sonar = SonarClient::new("http://127.0.0.1:9", "myapikey").unwrap();
        let res = sonar.tag_issues(&[], TAG_PUBLISHED).await.unwrap();
        assert_eq!(res, BulkActionResponse::default());
    }

    #[tokio::test]
    async fn non_success_status_is_mapped() {
        let mut server = Server::new_async().await;
        let _unauthorized = server
            .mock("GET", "/api/project_pull_requests/list")
            .match_query(Matcher::Any)
            .with_status(401)
            .create_async()
            .await;
        let _broken = server
            .mock("GET", "/api/issues/search")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let sonar = SonarClient::new(server.url(), "bad").unwrap();

        let err = sonar.project_pull_requests("p").await.unwrap_err();
        assert!(matches!(err, SonarError::Unauthorized));

        let err = sonar.list_issues_for_pr("p", "1").await.unwrap_err();
        assert!(matches!(err, SonarError::Server(503)));
    }

    #[tokio::test]
    async fn garbage_body_is_invalid_response() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/issues/search")
            .match_query(Matcher::Any)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let sonar = SonarClient::new(server.url(), "k").unwrap();
        let err = sonar.list_issues_for_pr("p", "1").await.unwrap_err();
        assert!(matches!(err, SonarError::InvalidResponse(_)));
    }
}
