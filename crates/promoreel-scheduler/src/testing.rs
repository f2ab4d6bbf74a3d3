//! Test doubles for the renderer and publisher collaborators.

use async_trait::async_trait;
use chrono::Utc;
use promoreel_core::{
    Artifact, CredentialSet, Credentials, PublishError, Publisher, Region, RemoteReference,
    RenderError, RenderRequest, Renderer, TemplateId, TemplateParams,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::StatusService;
use promoreel_core::{JobId, JobRecord};

pub fn crowned_payload() -> serde_json::Value {
    json!({
        "king_name": "Ana",
        "king_photo_url": "https://x/y.jpg",
        "amount": 10.0,
        "message": "hi"
    })
}

pub fn dethroned_payload() -> serde_json::Value {
    json!({
        "king_name": "Ana",
        "king_photo_url": "https://x/y.jpg",
        "amount": 2500.0,
        "dethroned_name": "Bruno",
        "dethroned_photo_url": "https://x/b.jpg",
        "dethroned_reign_days": 3
    })
}

pub fn crowned_params() -> TemplateParams {
    TemplateParams::parse(TemplateId::A, crowned_payload()).unwrap()
}

pub fn credentials() -> CredentialSet {
    CredentialSet::new()
        .with(Region::Br, Credentials::new("acct-br", "token-br"))
        .with(Region::Global, Credentials::new("acct-global", "token-global"))
}

/// Poll the status service until the job reaches a terminal state.
pub async fn wait_terminal(status: &StatusService, id: JobId) -> JobRecord {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let record = status.get(&id).unwrap();
            if record.status().is_terminal() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("job did not finish in time")
}

enum RenderBehavior {
    Succeed,
    Fail(fn() -> RenderError),
    Panic,
}

pub struct FakeRenderer {
    behavior: RenderBehavior,
    gate: Option<Arc<Semaphore>>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl FakeRenderer {
    fn with(behavior: RenderBehavior) -> Self {
        Self {
            behavior,
            gate: None,
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn ok() -> Self {
        Self::with(RenderBehavior::Succeed)
    }

    pub fn failing(error: fn() -> RenderError) -> Self {
        Self::with(RenderBehavior::Fail(error))
    }

    pub fn panicking() -> Self {
        Self::with(RenderBehavior::Panic)
    }

    /// Each render waits for one permit from `gate`.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::ok()
        }
    }

    /// Renders currently in progress.
    pub fn active(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.active)
    }

    /// Highest number of renders seen in progress at once.
    pub fn peak(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.peak)
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn render(&self, request: &RenderRequest) -> Result<Artifact, RenderError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        match self.behavior {
            RenderBehavior::Succeed => {
                let king = request.parameters.king();
                Ok(Artifact {
                    location: PathBuf::from(format!("/tmp/{}.mp4", request.job_id)),
                    region: king.region,
                    duration_ms: request.plan.duration_ms,
                    caption_subject: king.king_name.clone(),
                    amount_display: king.region.format_amount(king.amount),
                    persist_file: king.persist_file,
                    created_at: Utc::now(),
                })
            }
            RenderBehavior::Fail(error) => Err(error()),
            RenderBehavior::Panic => panic!("renderer exploded"),
        }
    }
}

pub struct FakePublisher {
    fail: Option<fn() -> PublishError>,
    /// Restricts `fail` to one account.
    fail_account: Option<&'static str>,
    calls: Arc<AtomicUsize>,
}

impl FakePublisher {
    pub fn ok() -> Self {
        Self {
            fail: None,
            fail_account: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(error: fn() -> PublishError) -> Self {
        Self {
            fail: Some(error),
            ..Self::ok()
        }
    }

    /// Fails only when publishing to `account_id`.
    pub fn failing_for(account_id: &'static str, error: fn() -> PublishError) -> Self {
        Self {
            fail_account: Some(account_id),
            ..Self::failing(error)
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Publisher for FakePublisher {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn publish(
        &self,
        artifact: &Artifact,
        credentials: &Credentials,
    ) -> Result<RemoteReference, PublishError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.fail {
            if self
                .fail_account
                .is_none_or(|account| account == credentials.account_id)
            {
                return Err(error());
            }
        }
        Ok(RemoteReference {
            platform: "fake".to_string(),
            remote_id: format!("{}-{}", credentials.account_id, artifact.caption_subject),
            published_at: Utc::now(),
        })
    }
}
