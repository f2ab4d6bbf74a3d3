//! Job submission.
//!
//! Submitting validates the request, records the job as PENDING and hands it
//! to the worker pool. It never waits for a worker to become free.

use promoreel_core::{Error, JobId, JobRecord, Result, TemplateParams};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use crate::events::JobEvent;
use crate::store::{JobStore, JobWriter};

/// A job waiting for a worker. Carries the only write handle to its record.
pub(crate) struct JobTicket {
    pub(crate) writer: JobWriter,
}

/// Cloneable submission handle.
#[derive(Clone)]
pub struct Scheduler {
    store: Arc<JobStore>,
    queue: mpsc::UnboundedSender<JobTicket>,
    events: broadcast::Sender<JobEvent>,
}

impl Scheduler {
    pub(crate) fn new(
        store: Arc<JobStore>,
        queue: mpsc::UnboundedSender<JobTicket>,
        events: broadcast::Sender<JobEvent>,
    ) -> Self {
        Self {
            store,
            queue,
            events,
        }
    }

    /// Validate a raw request and enqueue it.
    ///
    /// Unknown templates and invalid parameters are rejected without creating
    /// a job.
    pub fn submit(
        &self,
        template: &str,
        params: serde_json::Value,
        publish_requested: bool,
    ) -> Result<JobId> {
        let params = TemplateParams::from_request(template, params)?;
        self.submit_params(params, publish_requested)
    }

    /// Enqueue already-parsed parameters.
    pub fn submit_params(&self, params: TemplateParams, publish_requested: bool) -> Result<JobId> {
        params.validate()?;

        let record = JobRecord::new(params, publish_requested);
        let job_id = record.job_id();
        let template = record.template();
        let event = JobEvent::from_record(&record);
        let (pending, writer) = JobStore::prepare(record);

        // The worker cannot start the job until PENDING has been announced.
        let hold = pending.hold();
        // Enqueue before announcing or inserting: a closed pool leaves no trace.
        self.queue
            .send(JobTicket { writer })
            .map_err(|_| Error::ShuttingDown)?;
        let _ = self.events.send(event);
        drop(hold);
        self.store.insert(pending);

        info!(
            job_id = %job_id,
            template = %template,
            publish = publish_requested,
            "Job accepted"
        );
        debug!(jobs = self.store.len(), "Job store size");

        Ok(job_id)
    }
}
