use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::infrastructure::ffmpeg::probe::MediaGeometry;

/// One entry of a job's ordered event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Progress { percent: u8 },
    LogLine { text: String },
    Done { output: String },
    Failed,
}

impl Event {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Done { .. } | Event::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Running,
    Done,
    Failed,
}

impl JobState {
    pub fn from_last(event: Option<&Event>) -> Self {
        match event {
            Some(Event::Done { .. }) => JobState::Done,
            Some(Event::Failed) => JobState::Failed,
            _ => JobState::Running,
        }
    }
}

/// What a caller hands the orchestrator to start a job.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub source: PathBuf,
    pub shader_source: String,
    pub params: Value,
    pub frame_rate: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    pub output_name: String,
    pub geometry: MediaGeometry,
    pub frame_rate: u32,
    pub shader_source: String,
    pub shader_params: Value,
    pub created_at: OffsetDateTime,
}

impl Job {
    /// Public reference the client uses to fetch the finished video.
    pub fn output_url(&self) -> String {
        format!("/download/{}", self.output_name)
    }
}

/// `clip.mov` at 30 fps becomes `clip_shaded_30.mp4`.
pub fn output_name_for(source_name: &str, frame_rate: u32) -> String {
    let stem = std::path::Path::new(source_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    format!("{}_shaded_{}.mp4", stem, frame_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_events() {
        assert!(Event::Failed.is_terminal());
        assert!(Event::Done { output: "/download/x.mp4".into() }.is_terminal());
        assert!(!Event::Progress { percent: 100 }.is_terminal());
        assert!(!Event::LogLine { text: "done".into() }.is_terminal());
    }

    #[test]
    fn output_name_keeps_stem_and_rate() {
        assert_eq!(output_name_for("abc_clip.mov", 30), "abc_clip_shaded_30.mp4");
        assert_eq!(output_name_for("noext", 120), "noext_shaded_120.mp4");
        assert_eq!(output_name_for("a.b.mp4", 60), "a.b_shaded_60.mp4");
    }

    #[test]
    fn state_follows_last_event() {
        assert_eq!(JobState::from_last(None), JobState::Running);
        assert_eq!(JobState::from_last(Some(&Event::Progress { percent: 3 })), JobState::Running);
        assert_eq!(JobState::from_last(Some(&Event::Failed)), JobState::Failed);
    }
}
