//! Argument vectors for the decode | filter | encode process chain.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::process::Command;

use super::probe::MediaGeometry;
use crate::config::settings::ToolConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Filter,
    Encode,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Decode => "decode",
            Stage::Filter => "filter",
            Stage::Encode => "encode",
        })
    }
}

/// One process of the chain: program, argv and extra environment.
#[derive(Debug, Clone)]
pub struct StageCommand {
    pub stage: Stage,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub envs: Vec<(String, String)>,
}

impl StageCommand {
    fn new(stage: Stage, program: impl Into<PathBuf>) -> Self {
        Self {
            stage,
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// A `tokio` command with argv and env applied; stdio is left to the caller.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(self.envs.iter().map(|(k, v)| (k, v)));
        cmd
    }

    /// Shell rendering, for logs only.
    pub fn to_shell_string(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.envs {
            out.push_str(key);
            out.push('=');
            out.push_str(&shell_quote(OsStr::new(value)));
            out.push(' ');
        }
        out.push_str(&shell_quote(self.program.as_os_str()));
        for arg in &self.args {
            out.push(' ');
            out.push_str(&shell_quote(arg));
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct PipelinePlan {
    pub decode: StageCommand,
    pub filter: StageCommand,
    pub encode: StageCommand,
}

impl PipelinePlan {
    pub fn stages(&self) -> [&StageCommand; 3] {
        [&self.decode, &self.filter, &self.encode]
    }

    pub fn to_shell_string(&self) -> String {
        self.stages()
            .iter()
            .map(|s| s.to_shell_string())
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

pub struct PipelineRequest<'a> {
    pub source: &'a Path,
    pub output: &'a Path,
    pub geometry: MediaGeometry,
    pub frame_rate: u32,
    pub shader_path: &'a Path,
    pub params: &'a Value,
}

pub fn build(tools: &ToolConfig, req: &PipelineRequest<'_>) -> PipelinePlan {
    let MediaGeometry { width, height, .. } = req.geometry;
    let fps = req.frame_rate.to_string();

    let decode = StageCommand::new(Stage::Decode, &tools.ffmpeg)
        .args(["-hide_banner", "-nostats", "-loglevel", "error", "-y", "-i"])
        .arg(req.source)
        .arg("-vf")
        .arg(format!("fps={},scale={}:{}", req.frame_rate, width, height))
        .args(["-pix_fmt", "rgba", "-f", "rawvideo", "-"]);

    let filter = StageCommand::new(Stage::Filter, &tools.filter_runtime)
        .arg(&tools.filter_script)
        .arg(width.to_string())
        .arg(height.to_string())
        .arg(&fps)
        .arg(req.shader_path)
        .env(&tools.filter_params_env, req.params.to_string());

    let encode = StageCommand::new(Stage::Encode, &tools.ffmpeg)
        .args(["-hide_banner", "-y", "-f", "rawvideo", "-pix_fmt", "rgba", "-s"])
        .arg(format!("{}x{}", width, height))
        .arg("-r")
        .arg(&fps)
        .args(["-i", "-", "-i"])
        .arg(req.source)
        .args(["-map", "0:v", "-map", "1:a?"])
        .args([
            "-c:v", "libx264", "-pix_fmt", "yuv420p", "-profile:v", "high", "-level", "4.2",
            "-preset", "veryfast", "-crf", "20",
        ])
        .args(["-c:a", "aac", "-b:a", "160k", "-movflags", "+faststart", "-shortest"])
        .args(["-nostats", "-loglevel", "error", "-progress", "pipe:2"])
        .arg(req.output);

    PipelinePlan { decode, filter, encode }
}

/// POSIX single-quote escaping.
pub fn shell_quote(value: &OsStr) -> String {
    let value = value.to_string_lossy();
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c));
    if safe {
        return value.into_owned();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}
