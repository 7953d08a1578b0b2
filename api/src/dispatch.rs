//! Hand-off from the HTTP layer to the background workers.

use std::sync::Arc;

use issue_relay::{IssuePublisher, PublishOutcome, PublishTarget, RelayError};
use scm_review::SourceControl;
use services::{QueueClosed, RetryConfig, RetryResult, WorkQueue, retry_fixed};
use sonar_client::IssueTracker;
use tracing::{error, info, warn};

/// Accepts a publish target for asynchronous processing.
///
/// Implementations must return immediately; the outcome is only visible in logs.
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, target: PublishTarget) -> Result<(), QueueClosed>;
}

/// Enqueues one retried publish cycle per target on the worker pool.
pub struct PublishDispatcher<T, S> {
    publisher: Arc<IssuePublisher<T, S>>,
    queue: WorkQueue,
    retry: RetryConfig,
}

impl<T, S> PublishDispatcher<T, S> {
    pub fn new(publisher: Arc<IssuePublisher<T, S>>, queue: WorkQueue, retry: RetryConfig) -> Self {
        Self {
            publisher,
            queue,
            retry,
        }
    }
}

impl<T, S> Dispatch for PublishDispatcher<T, S>
where
    T: IssueTracker + 'static,
    S: SourceControl + 'static,
{
    fn dispatch(&self, target: PublishTarget) -> Result<(), QueueClosed> {
        let publisher = Arc::clone(&self.publisher);
        let retry = self.retry;

        self.queue.enqueue(async move {
            let label = target.to_string();
            let result = retry_fixed(retry, &label, || publisher.publish(&target)).await;
            log_result(&label, result);
        })
    }
}

fn log_result(label: &str, result: RetryResult<PublishOutcome, RelayError>) {
    match result {
        RetryResult::Success {
            value: PublishOutcome::NothingToPublish { pr_key },
            ..
        } => {
            info!(cycle = %label, pr = %pr_key, "no pending issues");
        }
        RetryResult::Success {
            value: PublishOutcome::Published { pr_key, comments, .. },
            failed_attempts,
        } => {
            info!(
                cycle = %label,
                pr = %pr_key,
                comments,
                failed_attempts,
                "issues published"
            );
        }
        RetryResult::PermanentError {
            error: err @ RelayError::NoRelevantIssues { .. },
            ..
        } => {
            warn!(cycle = %label, error = %err, "nothing mapped onto the diff");
        }
        RetryResult::PermanentError { error: err, .. } => {
            error!(cycle = %label, error = %err, "failed to publish issues");
        }
        RetryResult::ExhaustedRetries { last_error, attempts } => {
            error!(cycle = %label, attempts, error = %last_error, "failed to publish issues");
        }
    }
}
