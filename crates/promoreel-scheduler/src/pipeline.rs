//! Execution pipeline - drives one job from PENDING to a terminal state.

use futures::FutureExt;
use promoreel_core::{
    Artifact, CredentialSet, JobError, JobRecord, JobStatus, PublishError, Publisher,
    RemoteReference, RenderError, RenderRequest, Renderer, Result,
};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::events::JobEvent;
use crate::store::JobWriter;

/// Runs jobs through render and, when requested, publish.
///
/// A job visits each state at most once. Collaborator failures and panics end
/// the job in FAILED; they never escape to the caller.
pub struct ExecutionPipeline {
    renderer: Arc<dyn Renderer>,
    publisher: Arc<dyn Publisher>,
    credentials: CredentialSet,
    events: broadcast::Sender<JobEvent>,
}

impl ExecutionPipeline {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        publisher: Arc<dyn Publisher>,
        credentials: CredentialSet,
        events: broadcast::Sender<JobEvent>,
    ) -> Self {
        Self {
            renderer,
            publisher,
            credentials,
            events,
        }
    }

    /// Execute one job and return the status it ended in.
    pub async fn run(&self, mut job: JobWriter) -> JobStatus {
        let record = match self.transition(&mut job, JobRecord::start) {
            Ok(record) => record,
            Err(status) => return status,
        };

        info!(
            job_id = %record.job_id(),
            template = %record.template(),
            renderer = self.renderer.name(),
            "Rendering video"
        );

        let request = RenderRequest::new(record.job_id(), record.parameters().clone());
        let artifact = match self.render(&request).await {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(job_id = %record.job_id(), error = %e, "Render failed");
                let job_error = JobError::render(&e);
                return self.finish(&mut job, |r| r.fail(job_error));
            }
        };

        info!(
            job_id = %record.job_id(),
            location = %artifact.location.display(),
            "Render completed"
        );

        if !record.publish_requested() {
            return self.finish(&mut job, |r| r.complete(artifact));
        }

        if let Err(status) = self.transition(&mut job, |r| r.begin_publish(artifact.clone())) {
            return status;
        }

        info!(
            job_id = %record.job_id(),
            region = %artifact.region,
            publisher = self.publisher.name(),
            "Publishing video"
        );

        match self.publish(&artifact).await {
            Ok(remote) => {
                info!(job_id = %record.job_id(), remote_id = %remote.remote_id, "Published");
                self.finish(&mut job, |r| r.mark_published(remote))
            }
            Err(e) => {
                warn!(job_id = %record.job_id(), error = %e, "Publish failed");
                let job_error = JobError::publish(&e);
                self.finish(&mut job, |r| r.fail(job_error))
            }
        }
    }

    async fn render(
        &self,
        request: &RenderRequest,
    ) -> std::result::Result<Artifact, RenderError> {
        AssertUnwindSafe(self.renderer.render(request))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(RenderError::Failed("renderer panicked".to_string())))
    }

    /// Missing credentials are reported as a publish failure rather than
    /// rejected at submission, so videos can still be produced without them.
    async fn publish(
        &self,
        artifact: &Artifact,
    ) -> std::result::Result<RemoteReference, PublishError> {
        let Some(credentials) = self.credentials.for_region(artifact.region) else {
            return Err(PublishError::MissingCredentials {
                region: artifact.region,
            });
        };

        AssertUnwindSafe(self.publisher.publish(artifact, credentials))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(PublishError::Failed("publisher panicked".to_string())))
    }

    /// Apply a non-terminal transition. On failure returns the status the job
    /// is stuck in.
    fn transition<F>(
        &self,
        job: &mut JobWriter,
        f: F,
    ) -> std::result::Result<JobRecord, JobStatus>
    where
        F: FnOnce(&mut JobRecord) -> Result<()>,
    {
        match job.apply(f) {
            Ok(record) => {
                let _ = self.events.send(JobEvent::from_record(&record));
                Ok(record)
            }
            Err(e) => {
                error!(job_id = %job.job_id(), error = %e, "Rejected job transition");
                Err(job.snapshot().status())
            }
        }
    }

    fn finish<F>(&self, job: &mut JobWriter, f: F) -> JobStatus
    where
        F: FnOnce(&mut JobRecord) -> Result<()>,
    {
        match self.transition(job, f) {
            Ok(record) => {
                info!(job_id = %record.job_id(), status = %record.status(), "Job finished");
                record.status()
            }
            Err(status) => status,
        }
    }
}
