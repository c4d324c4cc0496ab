use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

/// Geometry and length of the first video stream of a file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaGeometry {
    pub width: u32,
    pub height: u32,
    /// Zero when unknown.
    pub duration_secs: f64,
}

impl MediaGeometry {
    /// Used whenever probing fails: portrait 720x1280, unknown duration.
    pub const FALLBACK: MediaGeometry = MediaGeometry {
        width: 720,
        height: 1280,
        duration_secs: 0.0,
    };

    pub fn has_duration(&self) -> bool {
        self.duration_secs > 0.0
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

/// Asks `ffprobe` for the first video stream's geometry. Never fails: any
/// problem yields [`MediaGeometry::FALLBACK`].
pub async fn probe(ffprobe: &Path, input: &Path) -> MediaGeometry {
    match try_probe(ffprobe, input).await {
        Ok(geometry) => {
            debug!(?geometry, input = %input.display(), "probed source");
            geometry
        }
        Err(e) => {
            warn!(input = %input.display(), "probe failed, using fallback geometry: {:#}", e);
            MediaGeometry::FALLBACK
        }
    }
}

async fn try_probe(ffprobe: &Path, input: &Path) -> Result<MediaGeometry> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,duration",
            "-of",
            "json",
        ])
        .arg(input)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("failed to run {}", ffprobe.display()))?;

    parse_probe_output(&output.stdout)
}

fn parse_probe_output(stdout: &[u8]) -> Result<MediaGeometry> {
    let parsed: ProbeOutput = serde_json::from_slice(stdout).context("invalid probe JSON")?;
    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no video stream"))?;

    let fallback = MediaGeometry::FALLBACK;
    let duration_secs = stream
        .duration
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(0.0);

    Ok(MediaGeometry {
        width: stream.width.filter(|w| *w > 0).unwrap_or(fallback.width),
        height: stream.height.filter(|h| *h > 0).unwrap_or(fallback.height),
        duration_secs,
    })
}
