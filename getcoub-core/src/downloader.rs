use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::fs;

use crate::command::{CommandExecutor, SystemCommandExecutor};
use crate::config::GetCoubConfig;
use crate::fetch::{CoubClient, FetchError};
use crate::notify::{PipelineObserver, TracingObserver};
use crate::remux::{RemuxError, RemuxJob, RemuxPipeline};

/// Errors of a whole download run; the message prefix names the failing
/// stage for the error notification channel.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to build http client: {0}")]
    Client(#[source] FetchError),
    #[error("error while loading coub page: {0}")]
    Page(#[source] FetchError),
    #[error("error while downloading video: {0}")]
    Video(#[source] FetchError),
    #[error("error while downloading audio: {0}")]
    Audio(#[source] FetchError),
    #[error("error while downloading thumbnail: {0}")]
    Thumbnail(#[source] FetchError),
    #[error("io error at {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error(transparent)]
    Remux(#[from] RemuxError),
}

pub type DownloadResult<T> = Result<T, DownloadError>;

/// One-shot coub downloader: resolve the page, pull the three assets into
/// the working directory, then hand them to the remux pipeline. Strictly
/// one coub per call; no retries, no resumption.
pub struct GetCoub {
    config: GetCoubConfig,
    client: CoubClient,
    pipeline: RemuxPipeline,
    observer: Arc<dyn PipelineObserver>,
}

impl GetCoub {
    /// Build a downloader with the real process executor and the
    /// tracing-backed observer.
    pub fn new(config: GetCoubConfig) -> DownloadResult<Self> {
        Self::with_parts(
            config,
            Arc::new(SystemCommandExecutor),
            Arc::new(TracingObserver),
        )
    }

    pub fn with_parts(
        config: GetCoubConfig,
        executor: Arc<dyn CommandExecutor>,
        observer: Arc<dyn PipelineObserver>,
    ) -> DownloadResult<Self> {
        let client =
            CoubClient::new(&config.network.user_agent).map_err(DownloadError::Client)?;
        let pipeline = RemuxPipeline::new(&config, executor, observer.clone());
        Ok(Self {
            config,
            client,
            pipeline,
            observer,
        })
    }

    /// Download one coub and return the final output path.
    pub async fn download(&self, link: &str) -> DownloadResult<PathBuf> {
        let job = match self.retrieve(link).await {
            Ok(job) => job,
            Err(err) => {
                // Remux failures notify from inside the pipeline; retrieval
                // failures are surfaced here so the channel fires once.
                self.observer.error(&err.to_string());
                return Err(err);
            }
        };
        let output = self.pipeline.run(&job).await?;
        Ok(output)
    }

    async fn retrieve(&self, link: &str) -> DownloadResult<RemuxJob> {
        let work_dir = &self.config.paths.work_dir;
        fs::create_dir_all(work_dir)
            .await
            .map_err(|source| DownloadError::Io {
                source,
                path: work_dir.clone(),
            })?;

        let sources = self
            .client
            .resolve(link)
            .await
            .map_err(DownloadError::Page)?;

        self.observer.progress("Loading video...");
        let video_path = work_dir.join(asset_name(&sources.video_url)?);
        self.client
            .download(&sources.video_url, &video_path)
            .await
            .map_err(DownloadError::Video)?;
        self.observer
            .progress(&format!("Video is loaded: {}", sources.video_url));

        self.observer.progress("Loading audio...");
        let audio_path = work_dir.join(asset_name(&sources.audio_url)?);
        self.client
            .download(&sources.audio_url, &audio_path)
            .await
            .map_err(DownloadError::Audio)?;
        self.observer
            .progress(&format!("Audio file is loaded: {}", sources.audio_url));

        // The thumbnail is fetched to confirm it exists but never written
        // out; CoubSources keeps the URL for callers that want it.
        self.observer.progress("Loading thumbnail...");
        self.client
            .fetch_bytes(&sources.thumb_url)
            .await
            .map_err(DownloadError::Thumbnail)?;
        self.observer
            .progress(&format!("Thumb image is loaded: {}", sources.thumb_url));

        Ok(RemuxJob {
            coub_id: sources.coub_id,
            video_path,
            audio_path,
        })
    }
}

fn asset_name(url: &str) -> DownloadResult<String> {
    crate::fetch::remote_basename(url).map_err(DownloadError::Page)
}
