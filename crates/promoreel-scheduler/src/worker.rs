//! Bounded worker pool.
//!
//! A single dispatcher pulls tickets in submission order and runs each on its
//! own task once a worker slot is free. At most `max_workers` jobs execute at
//! any moment; everything else waits in the queue as PENDING.

use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::pipeline::ExecutionPipeline;
use crate::queue::JobTicket;

pub(crate) struct WorkerPool {
    max_workers: usize,
    pipeline: Arc<ExecutionPipeline>,
}

impl WorkerPool {
    pub(crate) fn new(max_workers: usize, pipeline: ExecutionPipeline) -> Self {
        Self {
            max_workers: max_workers.max(1),
            pipeline: Arc::new(pipeline),
        }
    }

    /// Dispatch tickets until every sender is dropped, then wait for the jobs
    /// already running.
    pub(crate) async fn run(self, mut queue: mpsc::UnboundedReceiver<JobTicket>) {
        info!(max_workers = self.max_workers, "Starting worker pool");

        let slots = Arc::new(Semaphore::new(self.max_workers));
        let mut running = JoinSet::new();

        while let Some(ticket) = queue.recv().await {
            // Reap finished tasks so the set does not grow with history.
            while let Some(joined) = running.try_join_next() {
                log_join(joined);
            }

            let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
                break;
            };

            let pipeline = Arc::clone(&self.pipeline);
            let job_id = ticket.writer.job_id();
            debug!(job_id = %job_id, "Dispatching job");

            running.spawn(async move {
                let status = pipeline.run(ticket.writer).await;
                drop(permit);
                debug!(job_id = %job_id, status = %status, "Worker released");
            });
        }

        while let Some(joined) = running.join_next().await {
            log_join(joined);
        }
        info!("Worker pool stopped");
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "Worker task aborted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JobStore;
    use crate::testing::{FakePublisher, FakeRenderer, credentials, crowned_params};
    use promoreel_core::{JobRecord, JobStatus};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn make_ticket(store: &JobStore) -> (JobTicket, promoreel_core::JobId) {
        let (pending, writer) = JobStore::prepare(JobRecord::new(crowned_params(), false));
        let id = writer.job_id();
        store.insert(pending);
        (JobTicket { writer }, id)
    }

    #[tokio::test]
    async fn test_pool_never_exceeds_max_workers() {
        let gate = Arc::new(Semaphore::new(0));
        let renderer = FakeRenderer::gated(Arc::clone(&gate));
        let active = renderer.active();
        let peak = renderer.peak();
        let pipeline = ExecutionPipeline::new(
            Arc::new(renderer),
            Arc::new(FakePublisher::ok()),
            credentials(),
            crate::events::channel(),
        );

        let store = JobStore::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let mut ids = Vec::new();
        for _ in 0..6 {
            let (ticket, id) = make_ticket(&store);
            ids.push(id);
            tx.send(ticket).unwrap();
        }
        drop(tx);

        let pool = tokio::spawn(WorkerPool::new(2, pipeline).run(rx));

        // Wait until both slots are busy.
        tokio::time::timeout(Duration::from_secs(5), async {
            while active.load(Ordering::SeqCst) < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let pending = ids
            .iter()
            .filter(|id| store.get(id).unwrap().status() == JobStatus::Pending)
            .count();
        assert_eq!(pending, 4);

        gate.add_permits(6);
        tokio::time::timeout(Duration::from_secs(5), pool)
            .await
            .unwrap()
            .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 2);
        for id in &ids {
            assert_eq!(store.get(id).unwrap().status(), JobStatus::Completed);
        }
    }

    #[tokio::test]
    async fn test_zero_workers_is_treated_as_one() {
        let pipeline = ExecutionPipeline::new(
            Arc::new(FakeRenderer::ok()),
            Arc::new(FakePublisher::ok()),
            credentials(),
            crate::events::channel(),
        );
        let store = JobStore::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let (ticket, id) = make_ticket(&store);
        tx.send(ticket).unwrap();
        drop(tx);

        WorkerPool::new(0, pipeline).run(rx).await;

        assert_eq!(store.get(&id).unwrap().status(), JobStatus::Completed);
    }
}
