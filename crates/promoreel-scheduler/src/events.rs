//! Job lifecycle events.
//!
//! Polling the status service is the primary way to follow a job. Events are
//! a best-effort broadcast for in-process observers; slow receivers may miss
//! events and nothing waits on them.

use chrono::{DateTime, Utc};
use promoreel_core::{JobId, JobRecord, JobStatus};
use serde::Serialize;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 256;

/// A job entered a new status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobEvent {
    pub job_id: JobId,
    pub status: JobStatus,
    pub at: DateTime<Utc>,
}

impl JobEvent {
    pub fn from_record(record: &JobRecord) -> Self {
        Self {
            job_id: record.job_id(),
            status: record.status(),
            at: Utc::now(),
        }
    }
}

pub(crate) fn channel() -> broadcast::Sender<JobEvent> {
    let (tx, _rx) = broadcast::channel(EVENT_CAPACITY);
    tx
}
