//! Instagram Graph API publisher.
//!
//! Publishing a reel takes three calls:
//! 1. create a resumable upload container on the upload host
//! 2. send the video bytes to the URI the container returned
//! 3. publish the container with a caption
//!
//! The platform needs time to process the upload before step 3 succeeds,
//! hence the configurable delay between steps 2 and 3.

use async_trait::async_trait;
use chrono::Utc;
use promoreel_config::PublisherConfig;
use promoreel_core::{Artifact, Credentials, PublishError, Publisher, RemoteReference};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-request timeout. Uploads of a full reel fit well within it.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const PLATFORM: &str = "instagram";

#[derive(Debug, Deserialize)]
struct UploadContainer {
    id: String,
    uri: String,
}

#[derive(Debug, Deserialize)]
struct PublishedMedia {
    id: String,
}

/// Publishes reels through the Graph API over HTTP.
pub struct HttpPublisher {
    client: Client,
    base_url: String,
    upload_base_url: String,
    publish_delay: Duration,
}

impl HttpPublisher {
    pub fn new(config: &PublisherConfig) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("promoreel/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PublishError::Failed(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            upload_base_url: config.upload_base_url.trim_end_matches('/').to_string(),
            publish_delay: Duration::from_secs(config.publish_delay_secs),
        })
    }

    async fn create_container(
        &self,
        credentials: &Credentials,
    ) -> Result<UploadContainer, PublishError> {
        let url = format!("{}/{}/media", self.upload_base_url, credentials.account_id);
        let request = self
            .client
            .post(url)
            .query(&[("upload_type", "resumable"), ("media_type", "REELS")])
            .bearer_auth(credentials.access_token());
        send_json(request).await
    }

    async fn upload(
        &self,
        container: &UploadContainer,
        credentials: &Credentials,
        video: Vec<u8>,
    ) -> Result<(), PublishError> {
        let request = self
            .client
            .post(&container.uri)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("OAuth {}", credentials.access_token()),
            )
            .header("offset", "0")
            .header("file_size", video.len().to_string())
            .body(video);

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }
        Ok(())
    }

    async fn publish_container(
        &self,
        container: &UploadContainer,
        caption: &str,
        credentials: &Credentials,
    ) -> Result<PublishedMedia, PublishError> {
        let url = format!("{}/{}/media_publish", self.base_url, credentials.account_id);
        let request = self
            .client
            .post(url)
            .query(&[("creation_id", container.id.as_str()), ("caption", caption)])
            .bearer_auth(credentials.access_token());
        send_json(request).await
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    fn name(&self) -> &'static str {
        PLATFORM
    }

    async fn publish(
        &self,
        artifact: &Artifact,
        credentials: &Credentials,
    ) -> Result<RemoteReference, PublishError> {
        let video = match tokio::fs::read(&artifact.location).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PublishError::ArtifactMissing(artifact.location.clone()));
            }
            Err(e) => return Err(PublishError::Failed(e.to_string())),
        };

        info!(
            region = %artifact.region,
            account_id = %credentials.account_id,
            bytes = video.len(),
            "Starting reel upload"
        );

        let container = self.create_container(credentials).await?;
        debug!(container_id = %container.id, "Upload container created");

        self.upload(&container, credentials, video).await?;

        if !self.publish_delay.is_zero() {
            debug!(delay_secs = self.publish_delay.as_secs(), "Waiting for video processing");
            tokio::time::sleep(self.publish_delay).await;
        }

        let published = self
            .publish_container(&container, &artifact.caption(), credentials)
            .await?;
        info!(region = %artifact.region, remote_id = %published.id, "Reel published");

        if !artifact.persist_file {
            match tokio::fs::remove_file(&artifact.location).await {
                Ok(()) => debug!(path = %artifact.location.display(), "Removed published video"),
                Err(e) => warn!(
                    path = %artifact.location.display(),
                    error = %e,
                    "Failed to remove published video"
                ),
            }
        }

        Ok(RemoteReference {
            platform: PLATFORM.to_string(),
            remote_id: published.id,
            published_at: Utc::now(),
        })
    }
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, PublishError> {
    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(status, body));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| PublishError::Failed(format!("unexpected response body: {}", e)))
}

fn transport_error(e: reqwest::Error) -> PublishError {
    if e.is_timeout() {
        PublishError::Timeout(e.to_string())
    } else {
        PublishError::Network(e.to_string())
    }
}

/// Map a non-success HTTP status to a publish error.
fn status_error(status: StatusCode, body: String) -> PublishError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        PublishError::RateLimited(body)
    } else if status.is_server_error() {
        PublishError::Upstream {
            status: status.as_u16(),
            message: body,
        }
    } else if status.is_client_error() {
        PublishError::Rejected {
            status: status.as_u16(),
            message: body,
        }
    } else {
        PublishError::Failed(format!("unexpected status {}: {}", status, body))
    }
}
