//! Video job commands.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;

use super::ApiClient;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

const TERMINAL: [&str; 3] = ["completed", "published", "failed"];

#[derive(Debug, Deserialize)]
struct Accepted {
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct JobList {
    total: usize,
    jobs: Vec<Value>,
}

/// Read a parameters file. It must hold a JSON object.
fn read_params(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read params file: {}", path.display()))?;
    let params: Value = serde_json::from_str(&content)
        .with_context(|| format!("Params file is not valid JSON: {}", path.display()))?;
    if !params.is_object() {
        bail!("Params file must contain a JSON object: {}", path.display());
    }
    Ok(params)
}

pub async fn submit(
    api: &ApiClient,
    template: &str,
    params_path: &Path,
    publish: bool,
    wait: bool,
) -> Result<()> {
    let params = read_params(params_path)?;
    let accepted: Accepted = api
        .post(
            "/api/v1/videos/create",
            &[("publish", publish.to_string())],
            &json!({ "template": template, "params": params }),
        )
        .await?;

    println!("Accepted job {}", accepted.video_id);

    if wait {
        let record = wait_for_terminal(api, &accepted.video_id).await?;
        println!("{}", serde_json::to_string_pretty(&record)?);
        if record["status"] == "failed" {
            std::process::exit(1);
        }
    }
    Ok(())
}

async fn wait_for_terminal(api: &ApiClient, id: &str) -> Result<Value> {
    let path = format!("/api/v1/videos/{}", id);
    loop {
        let record: Value = api.get(&path, &[]).await?;
        let status = record["status"].as_str().unwrap_or_default();
        if TERMINAL.contains(&status) {
            return Ok(record);
        }
        eprintln!("  {}...", status);
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

pub async fn status(api: &ApiClient, id: &str) -> Result<()> {
    let record: Value = api.get(&format!("/api/v1/videos/{}", id), &[]).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

pub async fn list(api: &ApiClient, status: Option<String>, limit: usize) -> Result<()> {
    let mut query = vec![("limit", limit.to_string())];
    if let Some(status) = status {
        query.push(("status_filter", status));
    }

    let list: JobList = api.get("/api/v1/videos", &query).await?;
    if list.jobs.is_empty() {
        println!("No jobs");
        return Ok(());
    }

    for job in &list.jobs {
        println!("{}", format_row(job));
    }
    if list.total > list.jobs.len() {
        println!("({} of {} jobs shown)", list.jobs.len(), list.total);
    }
    Ok(())
}

fn format_row(job: &Value) -> String {
    let field = |name: &str| job[name].as_str().unwrap_or("-").to_string();
    let mut row = format!(
        "{}  {}  {:<10}  {}",
        field("job_id"),
        field("template"),
        field("status"),
        field("created_at")
    );
    if let Some(message) = job["error"]["message"].as_str() {
        row.push_str("  ");
        row.push_str(message);
    }
    row
}
