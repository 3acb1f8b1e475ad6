// SPDX-License-Identifier: AGPL-3.0-or-later

//! The callback worker pool (spec.md §5 "Worker pool"): executes user
//! completion callbacks off the listener task so a slow callback never
//! stalls the reactor. Sized by `Config::threads::max_threadpool_threads`.
//!
//! Jobs are pulled off one shared queue by every worker, so callbacks
//! "must assume parallel invocation across different operations but
//! in-order invocation is NOT guaranteed" (spec.md §5) falls out
//! naturally: whichever worker is free next picks up the next job.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{Mutex as AsyncMutex, mpsc};

use crate::{
    op::{CompletionResult, Operation},
    proto,
    status::Status,
};

/// One completed operation waiting to have its callback run.
pub struct CallbackJob {
    pub op: Operation,
    pub status: Status,
    pub command: Option<proto::Command>,
    pub value: Bytes,
}

fn run_job(job: CallbackJob) {
    match &job.command {
        Some(command) => crate::op::complete::dispatch(job.op, job.status, command, job.value),
        None => job.op.complete(CompletionResult { status: job.status }),
    }
}

/// A running pool of callback workers. Cloning shares the same queue.
#[derive(Clone)]
pub struct WorkerPool {
    tx: mpsc::Sender<CallbackJob>,
}

impl WorkerPool {
    /// Spawns `worker_count` tasks (at least one) pulling from one
    /// shared job queue.
    pub fn spawn(worker_count: usize) -> Self {
        let (tx, rx) = mpsc::channel(256);
        let rx = Arc::new(AsyncMutex::new(rx));
        for _ in 0..worker_count.max(1) {
            let rx = rx.clone();
            tokio::spawn(async move {
                loop {
                    let job = rx.lock().await.recv().await;
                    match job {
                        Some(job) => run_job(job),
                        None => return,
                    }
                }
            });
        }
        Self { tx }
    }

    /// Hands a completed operation to the pool. Falls back to running
    /// the callback inline if every worker has shut down, so a
    /// callback is never silently dropped.
    pub async fn submit(&self, job: CallbackJob) {
        if let Err(mpsc::error::SendError(job)) = self.tx.send(job).await {
            run_job(job);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::OperationKind;

    #[tokio::test]
    async fn submitted_callback_runs_and_observes_its_status() {
        let pool = WorkerPool::spawn(2);
        let (tx, rx) = tokio::sync::oneshot::channel();
        let op = Operation::new(
            1,
            OperationKind::Noop,
            Box::new(move |result| {
                let _ = tx.send(result.status);
            }),
        );
        pool.submit(CallbackJob {
            op,
            status: Status::Success,
            command: None,
            value: Bytes::new(),
        })
        .await;
        assert_eq!(rx.await.expect("callback ran"), Status::Success);
    }

    #[tokio::test]
    async fn many_jobs_across_few_workers_all_complete() {
        let pool = WorkerPool::spawn(2);
        let mut rxs = Vec::new();
        for i in 0..16u64 {
            let (tx, rx) = tokio::sync::oneshot::channel();
            let op = Operation::new(
                i,
                OperationKind::Noop,
                Box::new(move |result| {
                    let _ = tx.send(result.status);
                }),
            );
            pool.submit(CallbackJob {
                op,
                status: Status::Success,
                command: None,
                value: Bytes::new(),
            })
            .await;
            rxs.push(rx);
        }
        for rx in rxs {
            assert_eq!(rx.await.expect("callback ran"), Status::Success);
        }
    }
}
