//! Publisher trait and publish error types.
//!
//! Publishers upload a rendered artifact to a social platform account.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::{Artifact, Credentials, Region, RemoteReference};

/// Failure reported by a publisher.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("no publishing credentials configured for region {region}")]
    MissingCredentials { region: Region },

    #[error("artifact file not found: {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("publish rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("publish timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("publish failed: {0}")]
    Failed(String),
}

/// Trait for social platform publishers.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Name of the platform, recorded in [`RemoteReference::platform`].
    fn name(&self) -> &'static str;

    /// Publish a rendered artifact using the given account credentials.
    async fn publish(
        &self,
        artifact: &Artifact,
        credentials: &Credentials,
    ) -> Result<RemoteReference, PublishError>;
}
