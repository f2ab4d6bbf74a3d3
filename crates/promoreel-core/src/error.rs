//! Error types for PromoReel.

use thiserror::Error;

use crate::{JobId, JobStatus};

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("scheduler is shutting down")]
    ShuttingDown,

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error was raised at the submission boundary, before any
    /// job was created.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::UnknownTemplate(_) | Error::InvalidParameters(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
