//! Fixed-size worker pool draining an unbounded FIFO queue.
//!
//! Producers push boxed futures through a cloneable [`WorkQueue`] handle and
//! never wait for them. `W` long-lived workers share the receiving end and
//! run one job at a time each. A panicking job is logged and the worker
//! moves on to the next one.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Unit of work executed by the pool.
pub type Job = BoxFuture<'static, ()>;

/// The queue no longer accepts work (pool shut down).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("work queue is closed")]
pub struct QueueClosed;

/// Producer handle. Cheap to clone; every clone feeds the same queue.
#[derive(Debug, Clone)]
pub struct WorkQueue {
    tx: Arc<Mutex<Option<mpsc::UnboundedSender<Job>>>>,
}

impl WorkQueue {
    /// Appends `job` to the queue without waiting for it to run.
    pub fn enqueue<F>(&self, job: F) -> Result<(), QueueClosed>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(tx) => tx.send(job.boxed()).map_err(|_| QueueClosed),
            None => Err(QueueClosed),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Drops the only sender; workers drain what is queued and then stop.
    fn close(&self) {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// Owner of the worker tasks.
pub struct WorkerPool {
    queue: WorkQueue,
    workers: JoinSet<()>,
    size: usize,
}

impl WorkerPool {
    /// Spawns `workers` consumers (at least one) on the current runtime.
    pub fn start(workers: usize) -> Self {
        let size = workers.max(1);
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let rx = Arc::new(AsyncMutex::new(rx));

        let mut set = JoinSet::new();
        for id in 0..size {
            set.spawn(worker_loop(id, Arc::clone(&rx)));
        }
        info!(workers = size, "worker pool started");

        Self {
            queue: WorkQueue {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            workers: set,
            size,
        }
    }

    /// Producer handle for this pool.
    pub fn queue(&self) -> WorkQueue {
        self.queue.clone()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Stops accepting work and waits until every queued job has run.
    pub async fn shutdown(mut self) {
        self.queue.close();
        info!("worker pool draining");

        while let Some(res) = self.workers.join_next().await {
            if let Err(e) = res {
                error!(error = %e, "worker task failed");
            }
        }
        info!("worker pool stopped");
    }
}

async fn worker_loop(id: usize, rx: Arc<AsyncMutex<mpsc::UnboundedReceiver<Job>>>) {
    loop {
        // lock only while waiting for the next job, never while running it
        let next = { rx.lock().await.recv().await };
        let Some(job) = next else { break };

        debug!(worker = id, "job started");
        if let Err(panic) = AssertUnwindSafe(job).catch_unwind().await {
            error!(worker = id, panic = %panic_message(&*panic), "job panicked");
        }
    }
    debug!(worker = id, "worker exiting");
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio::sync::Barrier;

    #[tokio::test]
    async fn single_worker_runs_jobs_in_fifo_order() {
        let pool = WorkerPool::start(1);
        let queue = pool.queue();
        let seen = Arc::new(StdMutex::new(Vec::new()));

        for i in 0..10 {
            let seen = Arc::clone(&seen);
            queue
                .enqueue(async move {
                    seen.lock().unwrap().push(i);
                })
                .unwrap();
        }

        pool.shutdown().await;
        assert_eq!(*seen.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn workers_run_concurrently() {
        let pool = WorkerPool::start(3);
        let queue = pool.queue();
        let barrier = Arc::new(Barrier::new(4));

        for _ in 0..3 {
            let barrier = Arc::clone(&barrier);
            queue
                .enqueue(async move {
                    barrier.wait().await;
                })
                .unwrap();
        }

        // all three jobs must be parked on the barrier at the same time
        tokio::time::timeout(Duration::from_secs(5), barrier.wait())
            .await
            .expect("jobs did not run in parallel");
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn panicking_job_does_not_kill_worker() {
        let pool = WorkerPool::start(1);
        let queue = pool.queue();
        let seen = Arc::new(StdMutex::new(Vec::new()));

        queue
            .enqueue(async {
                panic!("boom");
            })
            .unwrap();
        let after = Arc::clone(&seen);
        queue
            .enqueue(async move {
                after.lock().unwrap().push("survived");
            })
            .unwrap();

        pool.shutdown().await;
        assert_eq!(*seen.lock().unwrap(), vec!["survived"]);
    }

    #[tokio::test]
    async fn enqueue_after_shutdown_is_rejected() {
        let pool = WorkerPool::start(2);
        let queue = pool.queue();
        assert_eq!(pool.size(), 2);
        assert!(!queue.is_closed());

        pool.shutdown().await;

        assert!(queue.is_closed());
        assert_eq!(queue.enqueue(async {}), Err(QueueClosed));
    }

    #[tokio::test]
    async fn zero_workers_still_starts_one() {
        let pool = WorkerPool::start(0);
        assert_eq!(pool.size(), 1);

        let (tx, rx) = tokio::sync::oneshot::channel();
        pool.queue()
            .enqueue(async move {
                let _ = tx.send(42);
            })
            .unwrap();

        assert_eq!(rx.await.unwrap(), 42);
        pool.shutdown().await;
    }

    #[test]
    fn panic_message_reads_common_payloads() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(&*s), "static");
        let s: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*s), "owned");
        let s: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*s), "unknown panic payload");
    }
}
