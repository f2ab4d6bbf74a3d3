//! Core domain types and traits for the PromoReel job engine.
//!
//! This crate contains:
//! - Job identifiers and the job record state machine
//! - Template variants and their typed parameters
//! - Renderer and publisher collaborator traits
//! - Publisher credentials
//! - Failure classification (transient vs permanent)

pub mod artifact;
pub mod classify;
pub mod credentials;
pub mod error;
pub mod id;
pub mod job;
pub mod publisher;
pub mod renderer;
pub mod template;

pub use artifact::{Artifact, RemoteReference};
pub use classify::{Classify, FailureClass};
pub use credentials::{CredentialSet, Credentials};
pub use error::{Error, Result};
pub use id::JobId;
pub use job::{ErrorKind, JobError, JobRecord, JobResult, JobStatus};
pub use publisher::{PublishError, Publisher};
pub use renderer::{RenderError, RenderRequest, Renderer};
pub use template::{Region, RenderPlan, TemplateId, TemplateParams};
