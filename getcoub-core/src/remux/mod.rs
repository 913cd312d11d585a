mod error;
mod manifest;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::process::Command;
use tracing::warn;

use crate::command::CommandExecutor;
use crate::config::GetCoubConfig;
use crate::notify::PipelineObserver;
use crate::probe::{MediaKind, MediaProber, StreamDescriptor};

pub use error::{RemuxError, RemuxResult};
pub use manifest::{loops_count, manifest_contents};

/// One remux run: three local files already sitting in the working
/// directory, identified by the coub id they came from.
#[derive(Debug, Clone)]
pub struct RemuxJob {
    pub coub_id: String,
    pub video_path: PathBuf,
    pub audio_path: PathBuf,
}

/// Pipeline state machine. Stages are strictly sequential; each one owns the
/// products of its predecessors, and any failure is terminal.
enum Stage {
    ProbeVideo,
    ProbeAudio {
        video: StreamDescriptor,
    },
    Transcode {
        video: StreamDescriptor,
        audio: StreamDescriptor,
    },
    Concat {
        video: StreamDescriptor,
        audio: StreamDescriptor,
        ts_path: PathBuf,
    },
    Mux {
        video: StreamDescriptor,
        audio: StreamDescriptor,
        ts_path: PathBuf,
        concat_path: PathBuf,
        manifest_path: PathBuf,
    },
    Cleanup {
        intermediates: Intermediates,
        output: PathBuf,
    },
    Completed {
        output: PathBuf,
    },
}

/// The five artifacts a run leaves in the working directory. Removal is
/// attempted for every file even when one fails; a deletion failure is
/// logged and never turns a completed run into an error.
struct Intermediates {
    ts: PathBuf,
    concat: PathBuf,
    raw_video: PathBuf,
    raw_audio: PathBuf,
    manifest: PathBuf,
}

impl Intermediates {
    async fn remove_all(&self) {
        for path in [
            &self.ts,
            &self.concat,
            &self.raw_video,
            &self.raw_audio,
            &self.manifest,
        ] {
            if let Err(error) = fs::remove_file(path).await {
                warn!(path = %path.display(), %error, "failed to remove temp artifact");
            }
        }
    }
}

pub struct RemuxPipeline {
    prober: MediaProber,
    ffmpeg: PathBuf,
    work_dir: PathBuf,
    output_dir: PathBuf,
    executor: Arc<dyn CommandExecutor>,
    observer: Arc<dyn PipelineObserver>,
}

impl RemuxPipeline {
    pub fn new(
        config: &GetCoubConfig,
        executor: Arc<dyn CommandExecutor>,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        let prober = MediaProber::new(
            config.tools.ffprobe.clone(),
            executor.clone(),
            observer.clone(),
        );
        Self {
            prober,
            ffmpeg: config.tools.ffmpeg.clone(),
            work_dir: config.paths.work_dir.clone(),
            output_dir: config.paths.output_dir.clone(),
            executor,
            observer,
        }
    }

    /// Drive the job through every stage and return the final output path.
    ///
    /// Emits the completion notification on success and the error
    /// notification on failure, exactly once each. A failed run leaves its
    /// intermediates in the working directory.
    pub async fn run(&self, job: &RemuxJob) -> RemuxResult<PathBuf> {
        match self.execute(job).await {
            Ok(output) => {
                self.observer.completed(&output);
                Ok(output)
            }
            Err(err) => {
                self.observer.error(&err.to_string());
                Err(err)
            }
        }
    }

    async fn execute(&self, job: &RemuxJob) -> RemuxResult<PathBuf> {
        let mut stage = Stage::ProbeVideo;
        loop {
            stage = match stage {
                Stage::ProbeVideo => {
                    let video = self
                        .prober
                        .probe(&job.video_path, MediaKind::Video)
                        .await
                        .map_err(RemuxError::VideoProbe)?;
                    Stage::ProbeAudio { video }
                }
                Stage::ProbeAudio { video } => {
                    let audio = self
                        .prober
                        .probe(&job.audio_path, MediaKind::Audio)
                        .await
                        .map_err(RemuxError::AudioProbe)?;
                    Stage::Transcode { video, audio }
                }
                Stage::Transcode { video, audio } => {
                    let ts_path = self.transcode_to_ts(&video).await?;
                    Stage::Concat {
                        video,
                        audio,
                        ts_path,
                    }
                }
                Stage::Concat {
                    video,
                    audio,
                    ts_path,
                } => {
                    let (concat_path, manifest_path) =
                        self.concat_loops(job, &video, &audio, &ts_path).await?;
                    Stage::Mux {
                        video,
                        audio,
                        ts_path,
                        concat_path,
                        manifest_path,
                    }
                }
                Stage::Mux {
                    video,
                    audio,
                    ts_path,
                    concat_path,
                    manifest_path,
                } => {
                    let output = self.mux(job, &video, &audio, &concat_path).await?;
                    Stage::Cleanup {
                        intermediates: Intermediates {
                            ts: ts_path,
                            concat: concat_path,
                            raw_video: video.path,
                            raw_audio: audio.path,
                            manifest: manifest_path,
                        },
                        output,
                    }
                }
                Stage::Cleanup {
                    intermediates,
                    output,
                } => {
                    self.observer.progress("Removing temporary files...");
                    intermediates.remove_all().await;
                    Stage::Completed { output }
                }
                Stage::Completed { output } => return Ok(output),
            };
        }
    }

    /// Repackage the source video into an MPEG-TS elementary stream. Stream
    /// copy only; the annex-b bitstream filter makes the H.264 stream safe
    /// to concatenate back to back.
    async fn transcode_to_ts(&self, video: &StreamDescriptor) -> RemuxResult<PathBuf> {
        let ts_path = with_suffix(&video.path, ".ts");
        let mut command = Command::new(&self.ffmpeg);
        command
            .arg("-i")
            .arg(&video.path)
            .arg("-c")
            .arg("copy")
            .arg("-bsf:v")
            .arg("h264_mp4toannexb")
            .arg("-f")
            .arg("mpegts")
            .arg("-y")
            .arg(&ts_path);
        self.run_tool(&mut command)
            .await
            .map_err(RemuxError::Transcode)?;
        self.observer
            .progress(&format!("Temp .ts file is ready: {}", ts_path.display()));
        Ok(ts_path)
    }

    /// Write the loop manifest and concatenate it into one continuous
    /// video-only file of `loops_count x video.duration` seconds.
    async fn concat_loops(
        &self,
        job: &RemuxJob,
        video: &StreamDescriptor,
        audio: &StreamDescriptor,
        ts_path: &Path,
    ) -> RemuxResult<(PathBuf, PathBuf)> {
        self.observer.progress("Merging .ts files...");
        let manifest_path = self.work_dir.join(format!("{}.txt", job.coub_id));
        let loops = loops_count(video, audio);
        fs::write(&manifest_path, manifest_contents(ts_path, loops))
            .await
            .map_err(|source| RemuxError::Io {
                source,
                path: manifest_path.clone(),
            })?;

        let concat_path = with_suffix(&video.path, ".mp4");
        let mut command = Command::new(&self.ffmpeg);
        command
            .arg("-f")
            .arg("concat")
            .arg("-safe")
            .arg("0")
            .arg("-i")
            .arg(&manifest_path)
            .arg("-c")
            .arg("copy")
            .arg(&concat_path);
        self.run_tool(&mut command)
            .await
            .map_err(RemuxError::Concat)?;
        self.observer.progress(&format!(
            "Merged into a single video: {}",
            concat_path.display()
        ));
        Ok((concat_path, manifest_path))
    }

    /// Mux the looped video with the original audio, stream copy, truncated
    /// to the shorter input. The fractional leftover loop is discarded, so
    /// the output runs for about the audio's duration.
    async fn mux(
        &self,
        job: &RemuxJob,
        video: &StreamDescriptor,
        audio: &StreamDescriptor,
        concat_path: &Path,
    ) -> RemuxResult<PathBuf> {
        self.observer.progress("Adding audio stream...");
        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| RemuxError::Io {
                source,
                path: self.output_dir.clone(),
            })?;
        let output = self
            .output_dir
            .join(format!("coub_{}_{}", job.coub_id, video.filename));
        let mut command = Command::new(&self.ffmpeg);
        command
            .arg("-i")
            .arg(concat_path)
            .arg("-i")
            .arg(&audio.path)
            .arg("-codec")
            .arg("copy")
            .arg("-shortest")
            .arg("-y")
            .arg(&output);
        self.run_tool(&mut command).await.map_err(RemuxError::Mux)?;
        Ok(output)
    }

    async fn run_tool(&self, command: &mut Command) -> Result<(), String> {
        let output = self
            .executor
            .run(command)
            .await
            .map_err(|err| err.to_string())?;
        if output.status.success() {
            Ok(())
        } else {
            Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut joined = path.as_os_str().to_os_string();
    joined.push(suffix);
    PathBuf::from(joined)
}
