use std::panic::AssertUnwindSafe;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use futures_util::FutureExt;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::infrastructure::ffmpeg::pipeline::{PipelinePlan, Stage, StageCommand};
use crate::infrastructure::storage::staging::StagedShader;
use crate::modules::shader::events::EventLog;
use crate::modules::shader::model::Event;
use crate::modules::shader::progress::{self, ProgressParser};

const DIAGNOSTIC_BUFFER: usize = 256;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to spawn {stage} stage: {source}")]
    Spawn {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },
    #[error("{stage} stage has no stdout to chain")]
    MissingPipe { stage: Stage },
    #[error("failed to wire {stage} stage output: {source}")]
    Pipe {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },
    #[error("failed waiting for pipeline: {0}")]
    Wait(#[source] std::io::Error),
    #[error("{stage} stage exited with {status}")]
    Exit { stage: Stage, status: ExitStatus },
}

/// Everything the background unit of one job owns.
pub struct JobRun {
    pub job_id: Uuid,
    pub plan: PipelinePlan,
    pub shader: StagedShader,
    pub events: Arc<EventLog>,
    pub duration_secs: f64,
    pub output_url: String,
    pub parser: Arc<dyn ProgressParser>,
}

pub fn spawn(run: JobRun) -> JoinHandle<()> {
    tokio::spawn(run_job(run))
}

/// Runs the pipeline to completion, appends the single terminal event and
/// removes the staged shader, whatever happened in between.
pub async fn run_job(run: JobRun) {
    let JobRun {
        job_id,
        plan,
        shader,
        events,
        duration_secs,
        output_url,
        parser,
    } = run;

    info!(%job_id, "🎨 starting shader pipeline");
    debug!(%job_id, pipeline = %plan.to_shell_string(), "pipeline command");

    let outcome = AssertUnwindSafe(execute(&plan, &events, duration_secs, parser.as_ref()))
        .catch_unwind()
        .await;

    let terminal = match outcome {
        Ok(Ok(())) => {
            info!(%job_id, output = %output_url, "✅ shader pipeline finished");
            Event::Done { output: output_url }
        }
        Ok(Err(e)) => {
            error!(%job_id, "❌ shader pipeline failed: {}", e);
            Event::Failed
        }
        Err(_) => {
            error!(%job_id, "❌ shader pipeline panicked");
            Event::Failed
        }
    };

    if let Err(e) = events.append(terminal) {
        warn!(%job_id, "could not record outcome: {}", e);
    }

    if let Err(e) = shader.remove() {
        warn!(%job_id, "failed to remove staged shader: {}", e);
    }
}

async fn execute(
    plan: &PipelinePlan,
    events: &EventLog,
    duration_secs: f64,
    parser: &dyn ProgressParser,
) -> Result<(), PipelineError> {
    let mut decode = spawn_stage(&plan.decode, Stdio::null(), Stdio::piped())?;
    let frames = chain_stdout(&mut decode, Stage::Decode)?;

    let mut filter = spawn_stage(&plan.filter, frames, Stdio::piped())?;
    let filtered = chain_stdout(&mut filter, Stage::Filter)?;

    let mut encode = spawn_stage(&plan.encode, filtered, Stdio::null())?;

    let (tx, rx) = mpsc::channel(DIAGNOSTIC_BUFFER);
    for (stage, child) in [
        (Stage::Decode, &mut decode),
        (Stage::Filter, &mut filter),
        (Stage::Encode, &mut encode),
    ] {
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stage, stderr, tx.clone()));
        }
    }
    drop(tx);

    progress::monitor(rx, duration_secs, parser, events).await;

    let (decoded, filtered, encoded) =
        tokio::try_join!(decode.wait(), filter.wait(), encode.wait()).map_err(PipelineError::Wait)?;

    for (stage, status) in [
        (Stage::Encode, encoded),
        (Stage::Filter, filtered),
        (Stage::Decode, decoded),
    ] {
        if !status.success() {
            return Err(PipelineError::Exit { stage, status });
        }
    }
    Ok(())
}

fn spawn_stage(stage: &StageCommand, stdin: Stdio, stdout: Stdio) -> Result<Child, PipelineError> {
    stage
        .command()
        .stdin(stdin)
        .stdout(stdout)
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| PipelineError::Spawn {
            stage: stage.stage,
            source,
        })
}

fn chain_stdout(child: &mut Child, stage: Stage) -> Result<Stdio, PipelineError> {
    let stdout = child
        .stdout
        .take()
        .ok_or(PipelineError::MissingPipe { stage })?;
    let stdio: Result<Stdio, std::io::Error> = stdout.try_into();
    stdio.map_err(|source| PipelineError::Pipe { stage, source })
}

/// Splits `reader` on newlines and feeds the monitor; invalid UTF-8 is
/// replaced rather than ending the stream.
async fn forward_lines<R>(stage: Stage, reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut segments = BufReader::new(reader).split(b'\n');
    loop {
        match segments.next_segment().await {
            Ok(Some(bytes)) => {
                let line = String::from_utf8_lossy(&bytes).into_owned();
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(%stage, "diagnostic stream read error: {}", e);
                break;
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::settings::ToolConfig;
    use crate::infrastructure::ffmpeg::pipeline::{self, PipelineRequest};
    use crate::infrastructure::ffmpeg::probe::MediaGeometry;
    use crate::modules::shader::progress::FfmpegProgressParser;
    use crate::test_support::{fake_ffmpeg, stub_tools, write_script};
    use futures_util::StreamExt;
    use serde_json::json;
    use std::path::{Path, PathBuf};

    fn job_run(dir: &Path, tools: &ToolConfig, duration_secs: f64) -> (JobRun, PathBuf) {
        let shader = StagedShader::stage(dir, "void main(){}").unwrap();
        let shader_path = shader.path().to_path_buf();
        let params = json!({"grain": 0.1});
        let source = dir.join("in.mp4");
        let output = dir.join("in_shaded_30.mp4");
        let plan = pipeline::build(
            tools,
            &PipelineRequest {
                source: &source,
                output: &output,
                geometry: MediaGeometry { width: 64, height: 36, duration_secs },
                frame_rate: 30,
                shader_path: &shader_path,
                params: &params,
            },
        );
        let run = JobRun {
            job_id: Uuid::new_v4(),
            plan,
            shader,
            events: Arc::new(EventLog::new()),
            duration_secs,
            output_url: "/download/in_shaded_30.mp4".into(),
            parser: Arc::new(FfmpegProgressParser),
        };
        (run, shader_path)
    }

    #[tokio::test]
    async fn successful_run_reports_progress_then_done() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(
            dir.path(),
            "echo out_time_ms=2500000 >&2\necho out_time_ms=10000000 >&2\nexit 0",
        );
        let tools = stub_tools(dir.path(), ffmpeg);
        let (run, shader_path) = job_run(dir.path(), &tools, 10.0);
        let events = Arc::clone(&run.events);

        spawn(run).await.unwrap();

        assert_eq!(
            events.snapshot(),
            vec![
                Event::Progress { percent: 25 },
                Event::Progress { percent: 100 },
                Event::Done { output: "/download/in_shaded_30.mp4".into() },
            ]
        );
        assert!(dir.path().join("seen_shader").exists());
        assert!(!shader_path.exists());
    }

    #[tokio::test]
    async fn non_zero_exit_ends_with_failed() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(
            dir.path(),
            "echo 'Invalid argument' >&2\necho 'Conversion failed!' >&2\nexit 1",
        );
        let tools = stub_tools(dir.path(), ffmpeg);
        let (run, shader_path) = job_run(dir.path(), &tools, 10.0);
        let events = Arc::clone(&run.events);

        let mut stream = events.subscribe();
        let handle = spawn(run);
        let mut seen = Vec::new();
        while let Some(event) = stream.next().await {
            seen.push(event);
        }
        handle.await.unwrap();

        assert_eq!(
            seen,
            vec![
                Event::LogLine { text: "Invalid argument".into() },
                Event::LogLine { text: "Conversion failed!".into() },
                Event::Failed,
            ]
        );
        assert!(dir.path().join("seen_shader").exists());
        assert!(!shader_path.exists());
    }

    #[tokio::test]
    async fn unknown_duration_passes_markers_through_as_logs() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(dir.path(), "echo out_time=00:00:01.000000 >&2\nexit 0");
        let tools = stub_tools(dir.path(), ffmpeg);
        let (run, _) = job_run(dir.path(), &tools, 0.0);
        let events = Arc::clone(&run.events);

        run_job(run).await;

        assert_eq!(
            events.snapshot(),
            vec![
                Event::LogLine { text: "out_time=00:00:01.000000".into() },
                Event::Done { output: "/download/in_shaded_30.mp4".into() },
            ]
        );
    }

    #[tokio::test]
    async fn spawn_failure_still_fails_the_job_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let tools = stub_tools(dir.path(), PathBuf::from("/nonexistent/ffmpeg-for-tests"));
        let (run, shader_path) = job_run(dir.path(), &tools, 10.0);
        let events = Arc::clone(&run.events);
        assert!(shader_path.exists());

        run_job(run).await;

        assert_eq!(events.snapshot(), vec![Event::Failed]);
        assert!(!shader_path.exists());
    }

    #[tokio::test]
    async fn failing_filter_fails_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(dir.path(), "exit 0");
        let mut tools = stub_tools(dir.path(), ffmpeg);
        tools.filter_script =
            write_script(dir.path(), "broken.sh", "echo 'shader compile error' >&2\nexit 3\n");
        let (run, shader_path) = job_run(dir.path(), &tools, 10.0);
        let events = Arc::clone(&run.events);

        run_job(run).await;

        let snapshot = events.snapshot();
        assert!(snapshot.contains(&Event::LogLine { text: "shader compile error".into() }));
        assert_eq!(snapshot.last(), Some(&Event::Failed));
        assert!(!shader_path.exists());
    }
}
