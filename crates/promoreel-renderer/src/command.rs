//! External command renderer.
//!
//! The encoder is a separate program. It receives the render request as JSON
//! on stdin and the path of the video to write as its last argument.

use async_trait::async_trait;
use chrono::Utc;
use promoreel_config::EngineConfig;
use promoreel_core::{Artifact, RenderError, RenderRequest, Renderer};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Longest stderr excerpt carried into an error message.
const STDERR_EXCERPT: usize = 2048;

/// Renders by running an external program once per job.
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
    output_dir: PathBuf,
    /// Unbounded unless set.
    timeout: Option<Duration>,
}

impl CommandRenderer {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            output_dir: output_dir.into(),
            timeout: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.renderer.program.clone(),
            config.renderer.args.clone(),
            config.output_dir.clone(),
        )
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `<output_dir>/<region>_<job_id>.mp4`
    fn output_path(&self, request: &RenderRequest) -> PathBuf {
        let region = request.parameters.region().as_str().to_lowercase();
        self.output_dir.join(format!("{}_{}.mp4", region, request.job_id))
    }

    async fn run(&self, output: &Path, payload: &[u8]) -> Result<(), RenderError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RenderError::Unavailable(format!("{}: {}", self.program, e)))?;

        let stdin = child.stdin.take();
        let feed = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(payload).await {
                // The program is free to ignore its input.
                Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            }
        };
        // Feed stdin while stderr is drained so neither pipe can stall the other.
        let exchange = async { tokio::join!(feed, child.wait_with_output()) };

        let (fed, waited) = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, exchange).await.map_err(|_| {
                RenderError::Timeout(format!(
                    "{} did not finish within {}ms",
                    self.program,
                    limit.as_millis()
                ))
            })?,
            None => exchange.await,
        };
        let result = waited?;
        fed.map_err(RenderError::Io)?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let stderr = stderr.trim();
            let excerpt = match stderr.char_indices().nth(STDERR_EXCERPT) {
                Some((cut, _)) => &stderr[..cut],
                None => stderr,
            };
            return Err(RenderError::Failed(format!(
                "{} exited with {}: {}",
                self.program, result.status, excerpt
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Renderer for CommandRenderer {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn render(&self, request: &RenderRequest) -> Result<Artifact, RenderError> {
        let started = Instant::now();
        let output = self.output_path(request);
        let payload = serde_json::to_vec(request)
            .map_err(|e| RenderError::InvalidInput(e.to_string()))?;

        tokio::fs::create_dir_all(&self.output_dir).await?;

        debug!(
            job_id = %request.job_id,
            program = %self.program,
            output = %output.display(),
            "Spawning renderer"
        );

        if let Err(e) = self.run(&output, &payload).await {
            warn!(
                job_id = %request.job_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %e,
                "Renderer invocation failed"
            );
            return Err(e);
        }

        if !tokio::fs::try_exists(&output).await? {
            return Err(RenderError::Failed(format!(
                "{} exited successfully but wrote no file at {}",
                self.program,
                output.display()
            )));
        }

        info!(
            job_id = %request.job_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            output = %output.display(),
            "Video rendered"
        );

        let king = request.parameters.king();
        Ok(Artifact {
            location: output,
            region: king.region,
            duration_ms: request.plan.duration_ms,
            caption_subject: king.king_name.clone(),
            amount_display: king.region.format_amount(king.amount),
            persist_file: king.persist_file,
            created_at: Utc::now(),
        })
    }
}
