//! Execution plumbing shared by the relay: a fixed-delay retry driver and a
//! fixed-size worker pool over an unbounded queue.

pub mod queue;
pub mod retry;

pub use queue::{Job, QueueClosed, WorkQueue, WorkerPool};
pub use retry::{RetryConfig, RetryResult, Retryable, retry_fixed};
