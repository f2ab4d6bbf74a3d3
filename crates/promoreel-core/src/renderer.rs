//! Renderer trait and render request types.
//!
//! Renderers turn a template and its parameters into a finished video file.
//! Encoding itself happens outside this workspace; a renderer only has to
//! honour this contract.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::{Artifact, JobId, RenderPlan, TemplateId, TemplateParams};

/// Everything a renderer needs to produce one video.
#[derive(Debug, Clone, Serialize)]
pub struct RenderRequest {
    /// Job this render belongs to.
    pub job_id: JobId,
    pub template: TemplateId,
    pub parameters: TemplateParams,
    /// Frame size and duration derived from the parameters.
    pub plan: RenderPlan,
}

impl RenderRequest {
    pub fn new(job_id: JobId, parameters: TemplateParams) -> Self {
        Self {
            job_id,
            template: parameters.template_id(),
            plan: parameters.render_plan(),
            parameters,
        }
    }
}

/// Failure reported by a renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("renderer unavailable: {0}")]
    Unavailable(String),

    #[error("render timed out: {0}")]
    Timeout(String),

    #[error("invalid render input: {0}")]
    InvalidInput(String),

    #[error("render failed: {0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for video renderers.
///
/// Implementations must be safe to call concurrently for distinct jobs.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Name of this renderer.
    fn name(&self) -> &'static str;

    /// Render a video and return a reference to the produced file.
    async fn render(&self, request: &RenderRequest) -> Result<Artifact, RenderError>;
}
