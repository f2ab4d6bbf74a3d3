//! Job engine for PromoReel.
//!
//! Accepts render jobs, runs them on a bounded worker pool and tracks every
//! job's status in memory. Rendering and publishing are delegated to the
//! [`Renderer`] and [`Publisher`] collaborators.

pub mod events;
pub mod pipeline;
pub mod queue;
pub mod status;
pub mod store;
mod worker;

#[cfg(test)]
mod testing;

pub use events::JobEvent;
pub use pipeline::ExecutionPipeline;
pub use queue::Scheduler;
pub use status::{DEFAULT_LIST_LIMIT, JobList, StatusService};
pub use store::JobStore;

use promoreel_config::EngineConfig;
use promoreel_core::{CredentialSet, Publisher, Renderer};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info};

use worker::WorkerPool;

/// A running engine: the store, the submission handle and the worker pool.
pub struct Engine {
    scheduler: Scheduler,
    status: StatusService,
    events: broadcast::Sender<JobEvent>,
    pool: JoinHandle<()>,
}

impl Engine {
    /// Start the worker pool on the current tokio runtime.
    pub fn start(
        max_workers: usize,
        credentials: CredentialSet,
        renderer: Arc<dyn Renderer>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        let store = Arc::new(JobStore::new());
        let events = events::channel();
        let (tx, rx) = mpsc::unbounded_channel();

        let pipeline = ExecutionPipeline::new(renderer, publisher, credentials, events.clone());
        let pool = tokio::spawn(WorkerPool::new(max_workers, pipeline).run(rx));

        Self {
            scheduler: Scheduler::new(Arc::clone(&store), tx, events.clone()),
            status: StatusService::new(store),
            events,
            pool,
        }
    }

    pub fn from_config(
        config: &EngineConfig,
        renderer: Arc<dyn Renderer>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self::start(
            config.max_workers,
            config.credentials.clone(),
            renderer,
            publisher,
        )
    }

    pub fn scheduler(&self) -> Scheduler {
        self.scheduler.clone()
    }

    pub fn status(&self) -> StatusService {
        self.status.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    /// Stop accepting work and wait for queued and running jobs to finish.
    ///
    /// Returns once every outstanding [`Scheduler`] clone has been dropped
    /// and the pool has drained.
    pub async fn shutdown(self) {
        info!("Shutting down job engine");
        drop(self.scheduler);
        if let Err(e) = self.pool.await {
            error!(error = %e, "Worker pool terminated abnormally");
        }
    }
}
