//! Read-only views over submitted jobs.

use promoreel_core::{Error, JobId, JobRecord, JobStatus, Result};
use serde::Serialize;
use std::sync::Arc;

use crate::store::JobStore;

/// Default page size for [`StatusService::list`].
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// A filtered page of jobs.
#[derive(Debug, Clone, Serialize)]
pub struct JobList {
    /// Jobs matching the filter before the limit was applied.
    pub total: usize,
    pub returned: usize,
    pub jobs: Vec<JobRecord>,
}

/// Answers status queries. Never blocks on running jobs.
#[derive(Clone)]
pub struct StatusService {
    store: Arc<JobStore>,
}

impl StatusService {
    pub(crate) fn new(store: Arc<JobStore>) -> Self {
        Self { store }
    }

    pub fn get(&self, job_id: &JobId) -> Result<JobRecord> {
        self.store
            .get(job_id)
            .ok_or_else(|| Error::NotFound(format!("job {}", job_id)))
    }

    /// List jobs, most recently submitted first.
    pub fn list(&self, status: Option<JobStatus>, limit: usize) -> JobList {
        let mut jobs: Vec<JobRecord> = self
            .store
            .snapshot()
            .into_iter()
            .rev()
            .filter(|record| status.is_none_or(|s| record.status() == s))
            .collect();
        // Stable sort keeps reverse insertion order for equal timestamps.
        jobs.sort_by(|a, b| b.created_at().cmp(&a.created_at()));

        let total = jobs.len();
        jobs.truncate(limit);

        JobList {
            total,
            returned: jobs.len(),
            jobs,
        }
    }
}
