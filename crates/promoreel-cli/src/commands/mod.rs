//! CLI command implementations.

pub mod videos;

use anyhow::{Context, Result, bail};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use url::Url;

/// Thin client for the PromoReel HTTP API.
pub struct ApiClient {
    client: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(api_url: &str) -> Result<Self> {
        let base = Url::parse(api_url)
            .and_then(|u| u.join("/"))
            .with_context(|| format!("Invalid API URL: {}", api_url))?;
        let client = Client::builder()
            .user_agent(concat!("promoreel-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, base })
    }

    pub fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("Invalid request path: {}", path))
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .client
            .get(self.url(path)?)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.base))?;
        decode(response).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.url(path)?)
            .query(query)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.base))?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    if !status.is_success() {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string());
        bail!("Server returned {}: {}", status, message);
    }
    serde_json::from_value(body).context("Unexpected response from server")
}

pub async fn health(api: &ApiClient) -> Result<()> {
    let body: Value = api.get("/health", &[]).await?;
    println!(
        "{} (version {}, {})",
        body["status"].as_str().unwrap_or("unknown"),
        body["version"].as_str().unwrap_or("?"),
        body["timestamp"].as_str().unwrap_or("?")
    );
    Ok(())
}

pub fn validate(path: &Path) -> Result<()> {
    match promoreel_config::EngineConfig::from_file(path) {
        Ok(config) => {
            println!("Configuration is valid");
            println!("  workers:    {}", config.max_workers);
            println!("  output-dir: {}", config.output_dir.display());
            println!("  renderer:   {}", config.renderer.program);
            Ok(())
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}
