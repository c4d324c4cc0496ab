use std::sync::Arc;

use futures_util::stream::BoxStream;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::model::{Event, Job, JobRequest, output_name_for};
use super::progress::{FfmpegProgressParser, ProgressParser};
use super::repository::{JobEntry, JobTable};
use crate::config::settings::AppConfig;
use crate::infrastructure::ffmpeg::pipeline::{self, PipelineRequest};
use crate::infrastructure::ffmpeg::probe;
use crate::infrastructure::storage::staging::StagedShader;
use crate::workers::shader_runner::{self, JobRun};

/// Failures reported to the submitter; no job exists when one is returned.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("source file not found: {0}")]
    SourceNotFound(String),
    #[error("shader support unavailable: {0} not found")]
    ShaderSupportMissing(String),
    #[error("failed to stage shader: {0}")]
    Staging(#[from] std::io::Error),
}

/// Owns the job table and launches one background unit per submitted job.
#[derive(Clone)]
pub struct ShaderService {
    config: Arc<AppConfig>,
    jobs: Arc<JobTable>,
    parser: Arc<dyn ProgressParser>,
}

impl ShaderService {
    pub fn new(config: Arc<AppConfig>, jobs: Arc<JobTable>) -> Self {
        Self::with_parser(config, jobs, Arc::new(FfmpegProgressParser))
    }

    pub fn with_parser(
        config: Arc<AppConfig>,
        jobs: Arc<JobTable>,
        parser: Arc<dyn ProgressParser>,
    ) -> Self {
        Self {
            config,
            jobs,
            parser,
        }
    }

    pub fn jobs(&self) -> &Arc<JobTable> {
        &self.jobs
    }

    /// Validates, probes, stages and launches. Returns as soon as the
    /// background unit is spawned.
    pub async fn submit(&self, req: JobRequest) -> Result<Uuid, SubmitError> {
        let frame_rate = req.frame_rate.unwrap_or(self.config.default_fps);
        if frame_rate == 0 || frame_rate > self.config.max_fps {
            return Err(SubmitError::Invalid(format!(
                "fps must be between 1 and {}",
                self.config.max_fps
            )));
        }
        if !req.source.is_file() {
            return Err(SubmitError::SourceNotFound(req.source.display().to_string()));
        }
        let tools = &self.config.tools;
        if !tools.filter_script.is_file() {
            return Err(SubmitError::ShaderSupportMissing(
                tools.filter_script.display().to_string(),
            ));
        }

        let geometry = probe::probe(&tools.ffprobe, &req.source).await;
        if !geometry.has_duration() {
            warn!(
                source = %req.source.display(),
                "unknown duration, progress markers will be logged as text"
            );
        }

        let source_name = req
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output_name = output_name_for(&source_name, frame_rate);
        let job = Job {
            id: Uuid::new_v4(),
            output_path: self.config.output_dir.join(&output_name),
            output_name,
            source_path: req.source,
            geometry,
            frame_rate,
            shader_source: req.shader_source,
            shader_params: req.params,
            created_at: OffsetDateTime::now_utc(),
        };

        let shader = StagedShader::stage(&self.config.shader_staging_dir, &job.shader_source)?;
        let plan = pipeline::build(
            tools,
            &PipelineRequest {
                source: &job.source_path,
                output: &job.output_path,
                geometry: job.geometry,
                frame_rate: job.frame_rate,
                shader_path: shader.path(),
                params: &job.shader_params,
            },
        );

        let job_id = job.id;
        let output_url = job.output_url();
        info!(
            %job_id,
            width = geometry.width,
            height = geometry.height,
            duration = geometry.duration_secs,
            fps = frame_rate,
            "📦 shader job accepted"
        );
        let events = self.jobs.insert(job);

        shader_runner::spawn(JobRun {
            job_id,
            plan,
            shader,
            events,
            duration_secs: geometry.duration_secs,
            output_url,
            parser: Arc::clone(&self.parser),
        });

        Ok(job_id)
    }

    /// Event stream for a job handle as given by a client. Unknown or
    /// malformed handles produce an empty stream.
    pub fn subscribe(&self, handle: &str) -> BoxStream<'static, Event> {
        let id = Uuid::parse_str(handle).unwrap_or(Uuid::nil());
        self.jobs.subscribe(&id)
    }

    pub fn find(&self, handle: &str) -> Option<Arc<JobEntry>> {
        let id = Uuid::parse_str(handle).ok()?;
        self.jobs.get(&id)
    }
}
