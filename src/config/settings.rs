use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::env::{self, EnvKey};

pub const DEFAULT_FPS: u32 = 120;
pub const DEFAULT_MAX_FPS: u32 = 240;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub shader_staging_dir: PathBuf,
    pub tools: ToolConfig,
    pub default_fps: u32,
    pub max_fps: u32,
    /// Zero disables eviction of finished jobs.
    pub job_retention: Duration,
    pub reaper_interval: Duration,
    pub upload_limit_bytes: usize,
}

/// External executables the pipeline shells out to.
#[derive(Clone, Debug)]
pub struct ToolConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub filter_runtime: PathBuf,
    pub filter_script: PathBuf,
    pub filter_params_env: String,
}

impl AppConfig {
    pub fn new() -> Self {
        let base = PathBuf::from(env::get_or(EnvKey::BaseDir, "."));
        let dir = |key: EnvKey, fallback: &Path| {
            env::get(key).map(PathBuf::from).unwrap_or_else(|_| fallback.to_path_buf())
        };

        Self {
            server_host: env::get_or(EnvKey::ServerHost, "0.0.0.0"),
            server_port: env::get_parsed(EnvKey::ServerPort, 5000),
            upload_dir: dir(EnvKey::UploadDir, &base.join("uploads")),
            output_dir: dir(EnvKey::OutputDir, &base.join("outputs")),
            shader_staging_dir: dir(EnvKey::ShaderStagingDir, &base),
            tools: ToolConfig {
                ffmpeg: PathBuf::from(env::get_or(EnvKey::FfmpegBin, "ffmpeg")),
                ffprobe: PathBuf::from(env::get_or(EnvKey::FfprobeBin, "ffprobe")),
                filter_runtime: PathBuf::from(env::get_or(EnvKey::FilterRuntime, "node")),
                filter_script: dir(EnvKey::FilterScript, &base.join("glfilter.js")),
                filter_params_env: env::get_or(EnvKey::FilterParamsEnv, "GL_PARAMS_JSON"),
            },
            default_fps: env::get_parsed(EnvKey::DefaultFps, DEFAULT_FPS),
            max_fps: env::get_parsed(EnvKey::MaxFps, DEFAULT_MAX_FPS),
            job_retention: Duration::from_secs(env::get_parsed(EnvKey::JobRetentionSecs, 0)),
            reaper_interval: Duration::from_secs(env::get_parsed(EnvKey::ReaperIntervalSecs, 60)),
            upload_limit_bytes: env::get_parsed(EnvKey::UploadLimitMb, 1024usize) * 1024 * 1024,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
