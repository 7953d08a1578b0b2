//! One-shot invocation: list pending issues for a branch, optionally publish
//! them as a review and/or tag them as published.

use std::time::Duration;

use anyhow::Context;
use colored::Colorize;
use issue_relay::{
    IssuePublisher, PublishConfig, PublishOutcome, PublishStage, RelayError, Settings,
    resolve_pending,
};
use scm_review::{ProviderClient, ProviderConfig};
use sonar_client::{Issue, IssueTracker, Issues, SonarClient, TAG_PUBLISHED};
use tracing::info;

use crate::CliArgs;

const CYCLE_TIMEOUT: Duration = Duration::from_secs(60);

pub async fn run(settings: Settings, args: CliArgs) -> anyhow::Result<()> {
    // Fail before any network call when publishing without a token.
    let provider = if args.publish {
        Some(settings.provider_config()?)
    } else {
        None
    };

    let tracker = SonarClient::new(&settings.sonar_root_url, &settings.sonar_api_key)?;

    tokio::time::timeout(CYCLE_TIMEOUT, run_once(tracker, provider, &args))
        .await
        .with_context(|| format!("{} timed out after {:?}", args.target(), CYCLE_TIMEOUT))?
}

/// Publish settings derived from the command line.
fn publish_config(args: &CliArgs) -> PublishConfig {
    PublishConfig {
        request_changes: args.request_changes,
        mark_as_published: args.mark,
        cycle_timeout: None,
    }
}

async fn run_once<T: IssueTracker>(
    tracker: T,
    provider: Option<ProviderConfig>,
    args: &CliArgs,
) -> anyhow::Result<()> {
    let target = args.target();
    let (pr, pending) = resolve_pending(&tracker, &target).await?;

    if pending.is_empty() {
        println!("{}", "No issues found!".green());
        return Ok(());
    }
    print_issues(&pending, tracker.root_url());

    let Some(provider) = provider else {
        if args.mark {
            let res = tracker
                .tag_issues(pending.as_slice(), TAG_PUBLISHED)
                .await
                .map_err(|e| RelayError::stage(PublishStage::TagPublished, &target, e))?;
            info!(
                marked = res.success,
                ignored = res.ignored,
                failed = res.failures,
                "mark as published result"
            );
        }
        return Ok(());
    };

    let scm = ProviderClient::from_config(provider)?;
    let publisher = IssuePublisher::new(tracker, scm, publish_config(args));

    if let PublishOutcome::Published {
        comments, tagged, ..
    } = publisher.publish_pending(&target, &pr, &pending).await?
    {
        info!(pr = %pr.key, comments, tagged = tagged.is_some(), "review published");
        println!("Published {comments} comments on {}", pr.url);
    }
    Ok(())
}

/// `[<status>] <type>: <path> L<line>:` followed by the markdown body.
fn format_issue(issue: &Issue, root: &str) -> String {
    format!(
        "[{}] {}: {} L{}:\n\t- {}",
        issue.status.yellow(),
        issue.kind.red(),
        issue.file_path().bold(),
        issue.line,
        issue.markdown_message(root)
    )
}

fn print_issues(issues: &Issues, root: &str) {
    for issue in issues {
        println!("{}", format_issue(issue, root));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use sonar_client::{BulkActionResponse, ProjectPullRequests, PullRequest, SonarResult};

    use super::*;
    use crate::BranchTypeArg;

    #[derive(Default)]
    struct FakeTracker {
        issues: Issues,
        tagged: Mutex<Vec<Vec<String>>>,
    }

    impl FakeTracker {
        fn tagged(&self) -> Vec<Vec<String>> {
            self.tagged.lock().unwrap().clone()
        }
    }

    impl IssueTracker for &FakeTracker {
        fn root_url(&self) -> &str {
            "https://sonar"
        }

        async fn project_pull_requests(&self, _project: &str) -> SonarResult<ProjectPullRequests> {
            Ok(ProjectPullRequests {
                pull_requests: vec![PullRequest {
                    key: "3".into(),
                    branch_name: "feat/newtest".into(),
                    url: "https://github.com/myorg/myproject/pull/3".into(),
                }],
            })
        }

        async fn list_issues_for_pr(&self, _project: &str, _pr_key: &str) -> SonarResult<Issues> {
            Ok(self.issues.clone())
        }

        async fn tag_issues(
            &self,
            issues: &[Issue],
            _tag: &str,
        ) -> SonarResult<BulkActionResponse> {
            let keys: Vec<String> = issues.iter().map(|i| i.key.clone()).collect();
            let n = keys.len() as u32;
            self.tagged.lock().unwrap().push(keys);
            Ok(BulkActionResponse {
                total: n,
                success: n,
                ignored: 0,
                failures: 0,
            })
        }
    }

    fn args(publish: bool, mark: bool) -> CliArgs {
        CliArgs {
            project: "myproject".into(),
            branch: "feat/newtest".into(),
            branch_type: BranchTypeArg::Branch,
            publish,
            mark,
            request_changes: false,
        }
    }

    fn open_issue(key: &str) -> Issue {
        Issue {
            key: key.into(),
            project: "myproject".into(),
            component: "myproject:pkg/my_file.go".into(),
            severity: "CRITICAL".into(),
            kind: "BUG".into(),
            rule: "go:S1234".into(),
            status: "OPEN".into(),
            line: 61,
            message: "My message".into(),
            ..Issue::default()
        }
    }

    #[test]
    fn issue_line_then_markdown() {
        colored::control::set_override(false);

        assert_eq!(
            format_issue(&open_issue("k1"), "https://my-sonar"),
            "[OPEN] BUG: pkg/my_file.go L61:\n\t- :bug::bangbang: CRITICAL: My message \
             ([go:S1234](https://my-sonar/coding_rules?open=go:S1234&rule_key=go:S1234))"
        );
    }

    #[test]
    fn flags_map_onto_publish_config() {
        let config = publish_config(&args(true, false));
        assert!(!config.mark_as_published);
        assert!(!config.request_changes);
        assert_eq!(config.cycle_timeout, None);

        let mut marked = args(true, true);
        marked.request_changes = true;
        let config = publish_config(&marked);
        assert!(config.mark_as_published);
        assert!(config.request_changes);
    }

    #[tokio::test]
    async fn mark_without_publish_tags_pending_issues() {
        let tracker = FakeTracker {
            issues: Issues::new(vec![open_issue("k1"), open_issue("k2")]),
            ..FakeTracker::default()
        };

        run_once(&tracker, None, &args(false, true)).await.unwrap();

        assert_eq!(tracker.tagged(), vec![vec!["k1".to_string(), "k2".to_string()]]);
    }

    #[tokio::test]
    async fn listing_only_leaves_issues_untouched() {
        let tracker = FakeTracker {
            issues: Issues::new(vec![open_issue("k1")]),
            ..FakeTracker::default()
        };

        run_once(&tracker, None, &args(false, false)).await.unwrap();

        assert!(tracker.tagged().is_empty());
    }

    #[tokio::test]
    async fn no_pending_issues_is_success() {
        let mut published = open_issue("k1");
        published.tags = vec![TAG_PUBLISHED.into()];
        let tracker = FakeTracker {
            issues: Issues::new(vec![published]),
            ..FakeTracker::default()
        };

        run_once(&tracker, None, &args(false, true)).await.unwrap();

        assert!(tracker.tagged().is_empty());
    }

    #[tokio::test]
    async fn unknown_branch_is_an_error() {
        let tracker = FakeTracker::default();
        let mut unknown = args(false, false);
        unknown.branch = "main".into();

        assert!(run_once(&tracker, None, &unknown).await.is_err());
    }
}
