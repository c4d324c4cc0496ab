use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use utoipa::ToSchema;
use validator::Validate;

use super::model::{Event, JobState};
use super::repository::JobEntry;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RunRequest {
    /// Name returned by the upload endpoint.
    #[serde(default)]
    #[validate(length(min = 1, message = "filename is required"))]
    pub filename: String,
    #[serde(default)]
    pub shader: String,
    /// Passed verbatim to the filter stage.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub params: Value,
    #[validate(range(min = 1, max = 240, message = "fps out of range"))]
    pub fps: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RunResponse {
    pub job: String,
}

/// Wire form of one [`Event`], sent as an SSE `data:` payload.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct EventMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<bool>,
}

impl From<&Event> for EventMessage {
    fn from(event: &Event) -> Self {
        match event {
            Event::Progress { percent } => Self {
                progress: Some(*percent),
                ..Default::default()
            },
            Event::LogLine { text } => Self {
                log: Some(text.clone()),
                ..Default::default()
            },
            Event::Done { output } => Self {
                done: Some(true),
                url: Some(output.clone()),
                ..Default::default()
            },
            Event::Failed => Self {
                error: Some(true),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobResponse {
    pub id: String,
    pub state: JobState,
    pub width: u32,
    pub height: u32,
    pub duration_seconds: f64,
    pub fps: u32,
    pub output_url: String,
    pub events: usize,
    #[serde(with = "time::serde::iso8601")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
}

impl From<&JobEntry> for JobResponse {
    fn from(entry: &JobEntry) -> Self {
        let job = &entry.job;
        Self {
            id: job.id.simple().to_string(),
            state: JobState::from_last(entry.events.last().as_ref()),
            width: job.geometry.width,
            height: job.geometry.height,
            duration_seconds: job.geometry.duration_secs,
            fps: job.frame_rate,
            output_url: job.output_url(),
            events: entry.events.len(),
            created_at: job.created_at,
        }
    }
}
