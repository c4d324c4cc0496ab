use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerHost,
    ServerPort,
    BaseDir,
    UploadDir,
    OutputDir,
    ShaderStagingDir,
    FfmpegBin,
    FfprobeBin,
    FilterRuntime,
    FilterScript,
    FilterParamsEnv,
    DefaultFps,
    MaxFps,
    JobRetentionSecs,
    ReaperIntervalSecs,
    UploadLimitMb,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerHost => "APP_HOST",
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::BaseDir => "BASE_DIR",
            EnvKey::UploadDir => "UPLOAD_DIR",
            EnvKey::OutputDir => "OUTPUT_DIR",
            EnvKey::ShaderStagingDir => "SHADER_STAGING_DIR",
            EnvKey::FfmpegBin => "FFMPEG_BIN",
            EnvKey::FfprobeBin => "FFPROBE_BIN",
            EnvKey::FilterRuntime => "FILTER_RUNTIME",
            EnvKey::FilterScript => "FILTER_SCRIPT",
            EnvKey::FilterParamsEnv => "FILTER_PARAMS_ENV",
            EnvKey::DefaultFps => "DEFAULT_FPS",
            EnvKey::MaxFps => "MAX_FPS",
            EnvKey::JobRetentionSecs => "JOB_RETENTION_SECS",
            EnvKey::ReaperIntervalSecs => "REAPER_INTERVAL_SECS",
            EnvKey::UploadLimitMb => "UPLOAD_LIMIT_MB",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
