//! Job records and their lifecycle.
//!
//! ```text
//! PENDING -> PROCESSING -> COMPLETED                 (publish not requested)
//!                       -> PUBLISHING -> PUBLISHED   (publish requested)
//!                                     -> FAILED
//!                       -> FAILED
//! ```
//!
//! Every transition goes through a method on [`JobRecord`], which rejects
//! anything not on that graph. Timestamps, `result` and `error` are written
//! exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::classify::{Classify, FailureClass};
use crate::{
    Artifact, Error, JobId, PublishError, RemoteReference, RenderError, Result, TemplateId,
    TemplateParams,
};

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Publishing,
    Published,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 6] = [
        JobStatus::Pending,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Publishing,
        JobStatus::Published,
        JobStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Publishing => "publishing",
            JobStatus::Published => "published",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Published | JobStatus::Failed
        )
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Publishing)
                | (JobStatus::Processing, JobStatus::Failed)
                | (JobStatus::Publishing, JobStatus::Published)
                | (JobStatus::Publishing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidParameters(format!("unknown job status: {}", s)))
    }
}

/// Which phase a job failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RenderError,
    PublishError,
}

/// Structured failure recorded on a FAILED job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: ErrorKind,
    /// Whether resubmitting the job might succeed.
    pub class: FailureClass,
    pub message: String,
}

impl JobError {
    pub fn render(err: &RenderError) -> Self {
        Self {
            kind: ErrorKind::RenderError,
            class: err.failure_class(),
            message: err.to_string(),
        }
    }

    pub fn publish(err: &PublishError) -> Self {
        Self {
            kind: ErrorKind::PublishError,
            class: err.failure_class(),
            message: err.to_string(),
        }
    }
}

/// Outcome of a successful job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobResult {
    pub artifact: Artifact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteReference>,
}

/// One submitted job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    job_id: JobId,
    template: TemplateId,
    parameters: TemplateParams,
    status: JobStatus,
    publish_requested: bool,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    /// Last good render. Survives a failed publish.
    artifact: Option<Artifact>,
    result: Option<JobResult>,
    error: Option<JobError>,
}

impl JobRecord {
    /// Create a PENDING record with a fresh id.
    pub fn new(parameters: TemplateParams, publish_requested: bool) -> Self {
        Self {
            job_id: JobId::new(),
            template: parameters.template_id(),
            parameters,
            status: JobStatus::Pending,
            publish_requested,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            artifact: None,
            result: None,
            error: None,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn template(&self) -> TemplateId {
        self.template
    }

    pub fn parameters(&self) -> &TemplateParams {
        &self.parameters
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn publish_requested(&self) -> bool {
        self.publish_requested
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    pub fn result(&self) -> Option<&JobResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&JobError> {
        self.error.as_ref()
    }

    /// PENDING -> PROCESSING.
    pub fn start(&mut self) -> Result<()> {
        self.transition(JobStatus::Processing)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// PROCESSING -> COMPLETED. Only valid when publishing was not requested.
    pub fn complete(&mut self, artifact: Artifact) -> Result<()> {
        if self.publish_requested {
            return Err(self.invalid(JobStatus::Completed));
        }
        self.transition(JobStatus::Completed)?;
        self.artifact = Some(artifact.clone());
        self.result = Some(JobResult {
            artifact,
            remote: None,
        });
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// PROCESSING -> PUBLISHING. Only valid when publishing was requested.
    pub fn begin_publish(&mut self, artifact: Artifact) -> Result<()> {
        if !self.publish_requested {
            return Err(self.invalid(JobStatus::Publishing));
        }
        self.transition(JobStatus::Publishing)?;
        self.artifact = Some(artifact);
        Ok(())
    }

    /// PUBLISHING -> PUBLISHED.
    pub fn mark_published(&mut self, remote: RemoteReference) -> Result<()> {
        let artifact = match (&self.artifact, self.status) {
            (Some(artifact), JobStatus::Publishing) => artifact.clone(),
            _ => return Err(self.invalid(JobStatus::Published)),
        };
        self.transition(JobStatus::Published)?;
        self.result = Some(JobResult {
            artifact,
            remote: Some(remote),
        });
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// PROCESSING or PUBLISHING -> FAILED.
    ///
    /// A render error is only accepted while processing and a publish error
    /// only while publishing.
    pub fn fail(&mut self, error: JobError) -> Result<()> {
        let phase_matches = matches!(
            (error.kind, self.status),
            (ErrorKind::RenderError, JobStatus::Processing)
                | (ErrorKind::PublishError, JobStatus::Publishing)
        );
        if !phase_matches {
            return Err(self.invalid(JobStatus::Failed));
        }
        self.transition(JobStatus::Failed)?;
        self.error = Some(error);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    fn transition(&mut self, next: JobStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(self.invalid(next));
        }
        self.status = next;
        Ok(())
    }

    fn invalid(&self, to: JobStatus) -> Error {
        Error::InvalidTransition {
            job_id: self.job_id,
            from: self.status,
            to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Region;
    use serde_json::json;
    use std::path::PathBuf;

    fn params() -> TemplateParams {
        TemplateParams::parse(
            TemplateId::A,
            json!({
                "king_name": "Ana",
                "king_photo_url": "https://x/y.jpg",
                "amount": 10.0
            }),
        )
        .unwrap()
    }

    fn artifact() -> Artifact {
        Artifact {
            location: PathBuf::from("/tmp/out.mp4"),
            region: Region::Br,
            duration_ms: 10_000,
            caption_subject: "Ana".to_string(),
            amount_display: "10,00".to_string(),
            persist_file: false,
            created_at: Utc::now(),
        }
    }

    fn remote() -> RemoteReference {
        RemoteReference {
            platform: "test".to_string(),
            remote_id: "post-1".to_string(),
            published_at: Utc::now(),
        }
    }

    #[test]
    fn test_new_record_is_pending() {
        let record = JobRecord::new(params(), false);
        assert_eq!(record.status(), JobStatus::Pending);
        assert_eq!(record.template(), TemplateId::A);
        assert!(record.started_at().is_none());
        assert!(record.completed_at().is_none());
        assert!(record.result().is_none());
        assert!(record.error().is_none());
    }

    #[test]
    fn test_render_only_lifecycle() {
        let mut record = JobRecord::new(params(), false);
        record.start().unwrap();
        assert_eq!(record.status(), JobStatus::Processing);
        record.complete(artifact()).unwrap();

        assert_eq!(record.status(), JobStatus::Completed);
        assert!(record.result().is_some());
        assert!(record.error().is_none());
        let started = record.started_at().unwrap();
        let completed = record.completed_at().unwrap();
        assert!(record.created_at() <= started && started <= completed);
    }

    #[test]
    fn test_publish_lifecycle() {
        let mut record = JobRecord::new(params(), true);
        record.start().unwrap();
        assert!(record.complete(artifact()).is_err());
        record.begin_publish(artifact()).unwrap();
        assert_eq!(record.status(), JobStatus::Publishing);
        assert!(record.completed_at().is_none());
        record.mark_published(remote()).unwrap();

        assert_eq!(record.status(), JobStatus::Published);
        let result = record.result().unwrap();
        assert_eq!(result.remote.as_ref().unwrap().remote_id, "post-1");
    }

    #[test]
    fn test_publish_not_requested_cannot_publish() {
        let mut record = JobRecord::new(params(), false);
        record.start().unwrap();
        assert!(matches!(
            record.begin_publish(artifact()),
            Err(Error::InvalidTransition {
                to: JobStatus::Publishing,
                ..
            })
        ));
        assert_eq!(record.status(), JobStatus::Processing);
    }

    #[test]
    fn test_publish_failure_keeps_artifact() {
        let mut record = JobRecord::new(params(), true);
        record.start().unwrap();
        record.begin_publish(artifact()).unwrap();
        record
            .fail(JobError::publish(&PublishError::MissingCredentials {
                region: Region::Br,
            }))
            .unwrap();

        assert_eq!(record.status(), JobStatus::Failed);
        assert!(record.result().is_none());
        assert_eq!(record.artifact().unwrap().caption_subject, "Ana");
        let error = record.error().unwrap();
        assert_eq!(error.kind, ErrorKind::PublishError);
        assert_eq!(error.class, FailureClass::Permanent);
    }

    #[test]
    fn test_render_failure() {
        let mut record = JobRecord::new(params(), true);
        record.start().unwrap();
        record
            .fail(JobError::render(&RenderError::Timeout("slow".into())))
            .unwrap();

        assert_eq!(record.status(), JobStatus::Failed);
        assert!(record.artifact().is_none());
        assert!(record.result().is_none());
        assert_eq!(record.error().unwrap().class, FailureClass::Transient);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut record = JobRecord::new(params(), false);
        record.start().unwrap();
        record.complete(artifact()).unwrap();
        let snapshot = record.clone();

        assert!(record.start().is_err());
        assert!(record.complete(artifact()).is_err());
        assert!(
            record
                .fail(JobError::render(&RenderError::Failed("late".into())))
                .is_err()
        );
        assert_eq!(record, snapshot);
    }

    #[test]
    fn test_error_kind_must_match_phase() {
        let mut record = JobRecord::new(params(), true);
        record.start().unwrap();
        let err = JobError::publish(&PublishError::Network("reset".into()));
        assert!(record.fail(err).is_err());
        assert_eq!(record.status(), JobStatus::Processing);
    }

    #[test]
    fn test_cannot_skip_processing() {
        let mut record = JobRecord::new(params(), false);
        assert!(record.complete(artifact()).is_err());
        assert!(
            record
                .fail(JobError::render(&RenderError::Failed("x".into())))
                .is_err()
        );
        assert_eq!(record.status(), JobStatus::Pending);
    }

    #[test]
    fn test_transition_graph() {
        use JobStatus::*;
        for from in JobStatus::ALL {
            for to in JobStatus::ALL {
                if from.is_terminal() {
                    assert!(!from.can_transition_to(to), "{} -> {}", from, to);
                }
                if to == Pending {
                    assert!(!from.can_transition_to(to));
                }
            }
        }
        assert!(Processing.can_transition_to(Failed));
        assert!(Publishing.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Failed));
    }

    #[test]
    fn test_status_parsing_and_serialization() {
        assert_eq!(
            "published".parse::<JobStatus>().unwrap(),
            JobStatus::Published
        );
        assert_eq!("FAILED".parse::<JobStatus>().unwrap(), JobStatus::Failed);
        assert!("done".parse::<JobStatus>().is_err());
        assert_eq!(
            serde_json::to_value(JobStatus::Publishing).unwrap(),
            json!("publishing")
        );
    }

    #[test]
    fn test_record_serialization() {
        let mut record = JobRecord::new(params(), true);
        record.start().unwrap();
        record
            .fail(JobError::render(&RenderError::Failed("exit 1".into())))
            .unwrap();

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["template"], "A");
        assert_eq!(value["parameters"]["king_name"], "Ana");
        assert_eq!(value["error"]["kind"], "render_error");
        assert_eq!(value["error"]["class"], "permanent");
        assert!(value["result"].is_null());
        assert!(value["artifact"].is_null());
    }
}
