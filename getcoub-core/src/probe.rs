use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;

use crate::command::CommandExecutor;
use crate::notify::PipelineObserver;

/// Result alias for probing operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors produced while inspecting a media file.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("ffprobe failed: {0}")]
    Tool(String),
    #[error("invalid ffprobe payload: {0}")]
    Parse(String),
    #[error("report contains no stream")]
    NoStream,
}

impl From<serde_json::Error> for ProbeError {
    fn from(source: serde_json::Error) -> Self {
        ProbeError::Parse(source.to_string())
    }
}

/// Which kind of stream a probe expects to find first in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

/// Normalized metadata for the first stream of a media file.
#[derive(Debug, Clone)]
pub struct StreamDescriptor {
    pub path: PathBuf,
    pub filename: String,
    pub codec: String,
    /// Seconds; always finite and non-negative.
    pub duration: f64,
    /// Kilobits per second. Video keeps three decimals, audio is rounded to
    /// a whole number; both derive from the same bits/sec report field.
    pub bit_rate: f64,
    pub details: StreamDetails,
}

#[derive(Debug, Clone)]
pub enum StreamDetails {
    Video { fps: f64, width: u32, height: u32 },
    Audio { sample_rate: u32 },
}

impl StreamDescriptor {
    pub fn kind(&self) -> MediaKind {
        match self.details {
            StreamDetails::Video { .. } => MediaKind::Video,
            StreamDetails::Audio { .. } => MediaKind::Audio,
        }
    }

    /// Human-readable one-liner used for progress notifications.
    pub fn summary(&self) -> String {
        match self.details {
            StreamDetails::Video { fps, width, height } => format!(
                "Video info: {}, {}x{}, {}s, {:.3}kbps, {}fps",
                self.codec, width, height, self.duration, self.bit_rate, fps
            ),
            StreamDetails::Audio { sample_rate } => format!(
                "Audio info: {}, {}s, {:.0}kbps, {}Hz",
                self.codec, self.duration, self.bit_rate, sample_rate
            ),
        }
    }
}

/// Runs the external inspection tool and normalizes its JSON report.
pub struct MediaProber {
    ffprobe: PathBuf,
    executor: Arc<dyn CommandExecutor>,
    observer: Arc<dyn PipelineObserver>,
}

impl MediaProber {
    pub fn new(
        ffprobe: PathBuf,
        executor: Arc<dyn CommandExecutor>,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        Self {
            ffprobe,
            executor,
            observer,
        }
    }

    /// Probe a media file and return the descriptor of its first stream.
    ///
    /// The invocation has no timeout; a hung tool hangs the run. Callers
    /// wanting a watchdog wrap the `CommandExecutor` they pass in.
    pub async fn probe(&self, path: &Path, kind: MediaKind) -> ProbeResult<StreamDescriptor> {
        let mut command = Command::new(&self.ffprobe);
        command
            .arg("-v")
            .arg("quiet")
            .arg("-print_format")
            .arg("json")
            .arg("-show_format")
            .arg("-show_streams")
            .arg(path);
        let output = self
            .executor
            .run(&mut command)
            .await
            .map_err(|err| ProbeError::Tool(err.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ProbeError::Tool(stderr));
        }
        let report: FfprobeReport = serde_json::from_slice(&output.stdout)?;
        let descriptor = descriptor_from_report(report, path, kind)?;
        self.observer.progress(&descriptor.summary());
        Ok(descriptor)
    }
}

/// Turns an ffprobe frame-rate string into a plain fps number.
///
/// Accepts either a bare number or a `numerator/denominator` rational.
/// Anything that does not divide to a finite number (zero denominator,
/// non-numeric tokens) yields `0.0`; frame rate is informational only and
/// must never abort a run.
pub fn parse_fps(raw: &str) -> f64 {
    let mut parts = raw.splitn(2, '/');
    let value = match (parts.next(), parts.next()) {
        (Some(numerator), Some(denominator)) => {
            let numerator: f64 = numerator.trim().parse().unwrap_or(f64::NAN);
            let denominator: f64 = denominator.trim().parse().unwrap_or(f64::NAN);
            numerator / denominator
        }
        (Some(single), None) => single.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    };
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn descriptor_from_report(
    report: FfprobeReport,
    path: &Path,
    kind: MediaKind,
) -> ProbeResult<StreamDescriptor> {
    let stream = report.streams.into_iter().next().ok_or(ProbeError::NoStream)?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let duration = stream
        .duration
        .as_ref()
        .and_then(NumberOrText::as_f64)
        .filter(|value| value.is_finite() && *value >= 0.0)
        .ok_or_else(|| ProbeError::Parse("stream duration missing or not a number".into()))?;
    let bits = stream
        .bit_rate
        .as_ref()
        .and_then(NumberOrText::as_f64)
        .unwrap_or(0.0);
    let details = match kind {
        MediaKind::Video => StreamDetails::Video {
            fps: stream
                .r_frame_rate
                .as_deref()
                .map(parse_fps)
                .unwrap_or(0.0),
            width: stream.width.unwrap_or(0),
            height: stream.height.unwrap_or(0),
        },
        MediaKind::Audio => StreamDetails::Audio {
            sample_rate: stream
                .sample_rate
                .as_ref()
                .and_then(NumberOrText::as_f64)
                .map(|value| value as u32)
                .unwrap_or(0),
        },
    };
    Ok(StreamDescriptor {
        path: path.to_path_buf(),
        filename,
        codec: stream.codec_name.unwrap_or_default(),
        duration,
        bit_rate: kbps_for_kind(bits, kind),
        details,
    })
}

// Video keeps three decimals, audio rounds to whole kbps.
fn kbps_for_kind(bits_per_second: f64, kind: MediaKind) -> f64 {
    let kbps = bits_per_second / 1000.0;
    match kind {
        MediaKind::Video => (kbps * 1000.0).round() / 1000.0,
        MediaKind::Audio => kbps.round(),
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeReport {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    codec_name: Option<String>,
    #[serde(default)]
    bit_rate: Option<NumberOrText>,
    #[serde(default)]
    duration: Option<NumberOrText>,
    #[serde(default)]
    r_frame_rate: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    sample_rate: Option<NumberOrText>,
}

/// ffprobe emits numeric fields as either JSON numbers or strings,
/// depending on the field and build.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    fn as_f64(&self) -> Option<f64> {
        match self {
            NumberOrText::Number(value) => Some(*value),
            NumberOrText::Text(text) => text.trim().parse().ok(),
        }
    }
}
