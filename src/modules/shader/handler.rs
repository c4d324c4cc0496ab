use std::convert::Infallible;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use futures_util::{Stream, StreamExt};
use serde_json::json;
use tracing::{debug, warn};
use validator::Validate;

use super::dto::{EventMessage, JobResponse, RunRequest, RunResponse};
use super::model::JobRequest;
use crate::common::response::{ApiError, ApiResponse, ApiSuccess};
use crate::state::AppState;

/// Start a shader job on an uploaded video
#[utoipa::path(
    post,
    path = "/api/v1/run",
    request_body = RunRequest,
    responses(
        (status = 200, description = "Job started", body = ApiResponse<RunResponse>),
        (status = 400, description = "Bad Request"),
        (status = 404, description = "Source file not found"),
        (status = 500, description = "Shader support unavailable")
    ),
    tag = "Shader"
)]
pub async fn run_shader(
    State(state): State<AppState>,
    Json(req): Json<RunRequest>,
) -> impl IntoResponse {
    if let Err(e) = req.validate() {
        return ApiError(e.to_string(), StatusCode::BAD_REQUEST).into_response();
    }

    let Some(source) = state.storage.resolve_upload(&req.filename) else {
        return ApiError("Invalid filename".to_string(), StatusCode::BAD_REQUEST).into_response();
    };

    let params = if req.params.is_null() { json!({}) } else { req.params };
    let job = JobRequest {
        source,
        shader_source: req.shader,
        params,
        frame_rate: req.fps,
    };

    match state.shaders.submit(job).await {
        Ok(id) => ApiSuccess(
            ApiResponse::success(RunResponse { job: id.simple().to_string() }, "Shader job started"),
            StatusCode::OK,
        )
        .into_response(),
        Err(e) => {
            warn!("rejected shader job: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Live event stream of a job
/// Replays every event from the start, then follows until the job ends.
/// Unknown jobs close the stream immediately.
#[utoipa::path(
    get,
    path = "/api/v1/logs/{job}",
    params(
        ("job" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Server-sent events, one JSON event per message", content_type = "text/event-stream", body = EventMessage)
    ),
    tag = "Shader"
)]
pub async fn stream_logs(
    State(state): State<AppState>,
    Path(job): Path<String>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    debug!(job = %job, "log stream opened");

    let events = state.shaders.subscribe(&job).map(|event| {
        let data = serde_json::to_string(&EventMessage::from(&event))
            .unwrap_or_else(|_| r#"{"error":true}"#.to_string());
        Ok(SseEvent::default().data(data))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Job summary
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{job}",
    params(
        ("job" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job found", body = ApiResponse<JobResponse>),
        (status = 404, description = "Job not found")
    ),
    tag = "Shader"
)]
pub async fn get_job(State(state): State<AppState>, Path(job): Path<String>) -> impl IntoResponse {
    match state.shaders.find(&job) {
        Some(entry) => ApiSuccess(
            ApiResponse::success(JobResponse::from(entry.as_ref()), "Job retrieved successfully"),
            StatusCode::OK,
        )
        .into_response(),
        None => ApiError("Job not found".to_string(), StatusCode::NOT_FOUND).into_response(),
    }
}
