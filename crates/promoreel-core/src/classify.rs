//! Failure classification.
//!
//! Each collaborator failure is either transient (worth resubmitting later)
//! or permanent (resubmitting the same request will fail again). The engine
//! never retries on its own; the class is recorded on the failed job.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{PublishError, RenderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    Transient,
    Permanent,
}

impl FailureClass {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureClass::Transient)
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureClass::Transient => f.write_str("transient"),
            FailureClass::Permanent => f.write_str("permanent"),
        }
    }
}

/// Errors that can say whether they are worth retrying.
pub trait Classify {
    fn failure_class(&self) -> FailureClass;
}

impl Classify for RenderError {
    fn failure_class(&self) -> FailureClass {
        match self {
            RenderError::Unavailable(_) | RenderError::Timeout(_) | RenderError::Io(_) => {
                FailureClass::Transient
            }
            RenderError::InvalidInput(_) | RenderError::Failed(_) => FailureClass::Permanent,
        }
    }
}

impl Classify for PublishError {
    fn failure_class(&self) -> FailureClass {
        match self {
            PublishError::RateLimited(_)
            | PublishError::Upstream { .. }
            | PublishError::Timeout(_)
            | PublishError::Network(_) => FailureClass::Transient,
            PublishError::MissingCredentials { .. }
            | PublishError::ArtifactMissing(_)
            | PublishError::Rejected { .. }
            | PublishError::Failed(_) => FailureClass::Permanent,
        }
    }
}
