//! Video job endpoints.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use promoreel_core::{JobId, JobRecord, JobStatus, TemplateId};
use promoreel_scheduler::{DEFAULT_LIST_LIMIT, JobList};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_videos))
        .route("/create", post(create_video))
        .route("/template/{template}", post(create_from_template))
        .route("/template-dynamic", post(create_dynamic))
        .route("/{id}", get(get_video))
}

#[derive(Debug, Deserialize)]
struct PublishQuery {
    publish: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct CreateVideoRequest {
    template: String,
    params: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct CreateVideoResponse {
    status: &'static str,
    message: String,
    video_id: JobId,
}

#[derive(Debug, Deserialize)]
struct ListVideosQuery {
    status_filter: Option<String>,
    limit: Option<usize>,
}

type Accepted = (StatusCode, Json<CreateVideoResponse>);

async fn create_video(
    State(state): State<AppState>,
    query: Result<Query<PublishQuery>, QueryRejection>,
    body: Result<Json<CreateVideoRequest>, JsonRejection>,
) -> Result<Accepted, ApiError> {
    let publish = publish_flag(query)?;
    let Json(req) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    submit(&state, &req.template, req.params, publish)
}

async fn create_from_template(
    State(state): State<AppState>,
    Path(template): Path<String>,
    query: Result<Query<PublishQuery>, QueryRejection>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Accepted, ApiError> {
    let publish = publish_flag(query)?;
    let Json(params) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    submit(&state, &template, params, publish)
}

async fn create_dynamic(
    state: State<AppState>,
    query: Result<Query<PublishQuery>, QueryRejection>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Accepted, ApiError> {
    create_from_template(
        state,
        Path(TemplateId::C.as_str().to_string()),
        query,
        body,
    )
    .await
}

fn publish_flag(query: Result<Query<PublishQuery>, QueryRejection>) -> Result<bool, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::Validation(e.body_text()))?;
    Ok(query.publish.unwrap_or(true))
}

fn submit(
    state: &AppState,
    template: &str,
    params: serde_json::Value,
    publish: bool,
) -> Result<Accepted, ApiError> {
    let video_id = state.scheduler.submit(template, params, publish)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(CreateVideoResponse {
            status: "accepted",
            message: "Job accepted".to_string(),
            video_id,
        }),
    ))
}

async fn get_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobRecord>, ApiError> {
    let job_id: JobId = id
        .parse()
        .map_err(|_| ApiError::NotFound(format!("job {}", id)))?;
    Ok(Json(state.status.get(&job_id)?))
}

async fn list_videos(
    State(state): State<AppState>,
    query: Result<Query<ListVideosQuery>, QueryRejection>,
) -> Result<Json<JobList>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::Validation(e.body_text()))?;
    let status = query
        .status_filter
        .as_deref()
        .map(str::parse::<JobStatus>)
        .transpose()?;
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    Ok(Json(state.status.list(status, limit)))
}
