//! Turns the encoder's `-progress` diagnostics into job events.

use tokio::sync::mpsc;
use tracing::debug;

use super::events::EventLog;
use super::model::Event;

/// How one diagnostic line should land in the event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    Progress(u8),
    Log(String),
    /// Recognised marker that carried nothing usable.
    Drop,
}

pub trait ProgressParser: Send + Sync {
    fn classify(&self, line: &str, duration_secs: f64) -> LineClass;
}

/// Parser for ffmpeg's `-progress` key/value output.
///
/// Recognises `out_time_ms=<microseconds>` and `out_time=HH:MM:SS[.frac]`.
/// With an unknown (zero) duration both markers fall back to plain log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegProgressParser;

const ELAPSED_MICROS_KEY: &str = "out_time_ms=";
const ELAPSED_TIMECODE_KEY: &str = "out_time=";

impl ProgressParser for FfmpegProgressParser {
    fn classify(&self, line: &str, duration_secs: f64) -> LineClass {
        let text = strip_terminator(line);
        let known = duration_secs > 0.0;
        let marker = text.trim();

        if let Some(value) = marker.strip_prefix(ELAPSED_MICROS_KEY) {
            if !known {
                return LineClass::Log(text.to_string());
            }
            return match parse_micros(value.trim()) {
                Some(micros) => LineClass::Progress(percent(micros as f64 / 1_000_000.0, duration_secs)),
                None => LineClass::Drop,
            };
        }

        if let Some(value) = marker.strip_prefix(ELAPSED_TIMECODE_KEY) {
            if !known {
                return LineClass::Log(text.to_string());
            }
            return match timecode_seconds(value.trim()) {
                Some(seconds) => LineClass::Progress(percent(seconds, duration_secs)),
                None => LineClass::Drop,
            };
        }

        LineClass::Log(text.to_string())
    }
}

fn strip_terminator(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

fn parse_micros(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// `HH:MM:SS[.frac]` to seconds.
pub fn timecode_seconds(value: &str) -> Option<f64> {
    let mut parts = value.split(':');
    let (hours, minutes, seconds) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let hours: u64 = hours.parse().ok()?;
    let minutes: u64 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }

    let whole = hours.checked_mul(3600)?.checked_add(minutes.checked_mul(60)?)?;
    Some(whole as f64 + seconds)
}

/// `round(elapsed / duration * 100)` clamped to `0..=100`.
pub fn percent(elapsed_secs: f64, duration_secs: f64) -> u8 {
    let pct = (elapsed_secs / duration_secs * 100.0).round();
    if pct.is_nan() {
        return 0;
    }
    pct.clamp(0.0, 100.0) as u8
}

/// Drains `lines` until every sender is gone, appending one event per usable
/// line. The terminal event is left to the caller.
pub async fn monitor(
    mut lines: mpsc::Receiver<String>,
    duration_secs: f64,
    parser: &dyn ProgressParser,
    log: &EventLog,
) {
    while let Some(line) = lines.recv().await {
        let event = match parser.classify(&line, duration_secs) {
            LineClass::Progress(percent) => Event::Progress { percent },
            LineClass::Log(text) => Event::LogLine { text },
            LineClass::Drop => continue,
        };
        if log.append(event).is_err() {
            debug!("event log sealed, discarding remaining diagnostics");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(line: &str, duration: f64) -> LineClass {
        FfmpegProgressParser.classify(line, duration)
    }

    #[test]
    fn micros_marker_becomes_percent() {
        assert_eq!(classify("out_time_ms=2500000", 10.0), LineClass::Progress(25));
        assert_eq!(classify("out_time_ms=10000000\n", 10.0), LineClass::Progress(100));
        assert_eq!(classify("out_time_ms=0", 10.0), LineClass::Progress(0));
    }

    #[test]
    fn progress_never_exceeds_hundred() {
        assert_eq!(classify("out_time_ms=99000000", 10.0), LineClass::Progress(100));
        assert_eq!(classify("out_time=01:00:00.000000", 10.0), LineClass::Progress(100));
    }

    #[test]
    fn timecode_marker_becomes_percent() {
        assert_eq!(classify("out_time=00:00:02.500000", 10.0), LineClass::Progress(25));
        assert_eq!(classify("out_time=00:01:00.000000", 240.0), LineClass::Progress(25));
        assert_eq!(classify("out_time=01:00:00", 7200.0), LineClass::Progress(50));
        assert_eq!(classify("  out_time=00:00:05.000000\r\n", 10.0), LineClass::Progress(50));
    }

    #[test]
    fn rounds_to_nearest() {
        assert_eq!(percent(1.0, 3.0), 33);
        assert_eq!(percent(2.0, 3.0), 67);
        assert_eq!(percent(0.0, 3.0), 0);
    }

    #[test]
    fn malformed_markers_are_dropped() {
        assert_eq!(classify("out_time_ms=N/A", 10.0), LineClass::Drop);
        assert_eq!(classify("out_time_ms=-5000", 10.0), LineClass::Drop);
        assert_eq!(classify("out_time_ms=", 10.0), LineClass::Drop);
        assert_eq!(classify("out_time=N/A", 10.0), LineClass::Drop);
        assert_eq!(classify("out_time=aa:00:01.0", 10.0), LineClass::Drop);
        assert_eq!(classify("out_time=00:01", 10.0), LineClass::Drop);
        assert_eq!(classify("out_time=00:00:01:00", 10.0), LineClass::Drop);
        assert_eq!(classify("out_time=-577014:32:22.77", 10.0), LineClass::Drop);
        assert_eq!(classify("out_time=18446744073709551615:00:00", 10.0), LineClass::Drop);
        assert_eq!(classify("out_time=00:18446744073709551615:00.0", 10.0), LineClass::Drop);
    }

    #[test]
    fn unknown_duration_degrades_markers_to_log_lines() {
        assert_eq!(
            classify("out_time=00:00:02.500000\n", 0.0),
            LineClass::Log("out_time=00:00:02.500000".into())
        );
        assert_eq!(
            classify("out_time_ms=2500000", 0.0),
            LineClass::Log("out_time_ms=2500000".into())
        );
        assert_eq!(classify("out_time=garbage", 0.0), LineClass::Log("out_time=garbage".into()));
    }

    #[test]
    fn other_lines_pass_through_verbatim() {
        assert_eq!(classify("frame=42\n", 10.0), LineClass::Log("frame=42".into()));
        assert_eq!(classify("  speed=1.2x\r\n", 10.0), LineClass::Log("  speed=1.2x".into()));
        assert_eq!(classify("out_time_us=2500000", 10.0), LineClass::Log("out_time_us=2500000".into()));
    }

    #[test]
    fn timecode_conversion() {
        assert_eq!(timecode_seconds("01:02:03.5"), Some(3723.5));
        assert_eq!(timecode_seconds("00:00:00"), Some(0.0));
        assert_eq!(timecode_seconds("00:00:inf"), None);
        assert_eq!(timecode_seconds(""), None);
        assert_eq!(timecode_seconds("18446744073709551615:00:00.0"), None);
    }

    #[tokio::test]
    async fn monitor_appends_in_order_and_skips_dropped_lines() {
        let log = EventLog::new();
        let (tx, rx) = mpsc::channel(16);
        for line in [
            "frame=1",
            "out_time_ms=N/A",
            "out_time_ms=2500000",
            "out_time=00:00:02.000000",
            "progress=end",
        ] {
            tx.send(line.to_string()).await.unwrap();
        }
        drop(tx);

        monitor(rx, 10.0, &FfmpegProgressParser, &log).await;

        assert_eq!(
            log.snapshot(),
            vec![
                Event::LogLine { text: "frame=1".into() },
                Event::Progress { percent: 25 },
                Event::Progress { percent: 20 },
                Event::LogLine { text: "progress=end".into() },
            ]
        );
    }
}
