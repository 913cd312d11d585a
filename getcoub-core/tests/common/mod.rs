#![allow(dead_code)]

use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::Mutex;

use tokio::process::Command;

use getcoub_core::{CommandExecutor, GetCoubConfig, NetworkSection, PathsSection, PipelineObserver, ToolsSection};

pub const VIDEO_REPORT: &str = r#"{
    "streams": [{
        "codec_name": "h264",
        "bit_rate": "1500123",
        "duration": "0.5",
        "r_frame_rate": "60/2",
        "width": 1280,
        "height": 720
    }]
}"#;

pub const AUDIO_REPORT: &str = r#"{
    "streams": [{
        "codec_name": "mp3",
        "bit_rate": "128499",
        "duration": "12.3",
        "sample_rate": "44100"
    }]
}"#;

/// Plays ffprobe and ffmpeg without spawning anything: probe calls answer
/// with canned JSON, ffmpeg calls create the file named by their last
/// argument. Records every invocation and the manifest handed to the
/// concat step.
pub struct ScriptedExecutor {
    pub invocations: Mutex<Vec<Vec<String>>>,
    pub video_report: String,
    pub audio_report: String,
    pub fail_video_probe: bool,
    pub manifest_lines: Mutex<Option<Vec<String>>>,
}

impl Default for ScriptedExecutor {
    fn default() -> Self {
        Self {
            invocations: Mutex::new(Vec::new()),
            video_report: VIDEO_REPORT.to_string(),
            audio_report: AUDIO_REPORT.to_string(),
            fail_video_probe: false,
            manifest_lines: Mutex::new(None),
        }
    }
}

impl ScriptedExecutor {
    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }

    pub fn manifest_line_count(&self) -> usize {
        self.manifest_lines
            .lock()
            .unwrap()
            .as_ref()
            .map(|lines| lines.len())
            .unwrap_or(0)
    }

    fn success(stdout: Vec<u8>) -> Output {
        Output {
            status: ExitStatus::from_raw(0),
            stdout,
            stderr: Vec::new(),
        }
    }

    fn failure(stderr: &str) -> Output {
        Output {
            status: ExitStatus::from_raw(1 << 8),
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }
}

#[async_trait::async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn run(&self, command: &mut Command) -> std::io::Result<Output> {
        let std_command = command.as_std();
        let program = std_command.get_program().to_string_lossy().to_string();
        let args: Vec<String> = std_command
            .get_args()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect();
        self.invocations
            .lock()
            .unwrap()
            .push(std::iter::once(program.clone()).chain(args.clone()).collect());

        if program.ends_with("ffprobe") {
            let input = args.last().cloned().unwrap_or_default();
            let is_audio = input.ends_with(".mp3");
            if !is_audio && self.fail_video_probe {
                return Ok(Self::failure("probe exploded"));
            }
            let report = if is_audio {
                self.audio_report.clone()
            } else {
                self.video_report.clone()
            };
            return Ok(Self::success(report.into_bytes()));
        }

        // ffmpeg: the output file is always the final argument.
        if let Some(manifest) = arg_after(&args, "-i").filter(|_| args.contains(&"concat".to_string()))
        {
            let contents = std::fs::read_to_string(&manifest)?;
            *self.manifest_lines.lock().unwrap() =
                Some(contents.lines().map(str::to_string).collect());
        }
        if let Some(output_path) = args.last() {
            std::fs::write(output_path, b"MEDIA")?;
        }
        Ok(Self::success(Vec::new()))
    }
}

fn arg_after(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|index| args.get(index + 1))
        .cloned()
}

#[derive(Default)]
pub struct RecordingObserver {
    pub progress: Mutex<Vec<String>>,
    pub completed: Mutex<Vec<PathBuf>>,
    pub errors: Mutex<Vec<String>>,
}

impl PipelineObserver for RecordingObserver {
    fn progress(&self, message: &str) {
        self.progress.lock().unwrap().push(message.to_string());
    }

    fn completed(&self, output: &Path) {
        self.completed.lock().unwrap().push(output.to_path_buf());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

pub fn test_config(base: &Path) -> GetCoubConfig {
    GetCoubConfig {
        tools: ToolsSection {
            ffprobe: PathBuf::from("ffprobe"),
            ffmpeg: PathBuf::from("ffmpeg"),
        },
        paths: PathsSection {
            work_dir: base.join("temp"),
            output_dir: base.join("downloads"),
        },
        network: NetworkSection {
            user_agent: "GetCoub/test".to_string(),
        },
    }
}
