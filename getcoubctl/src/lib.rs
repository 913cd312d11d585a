use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use thiserror::Error;

use getcoub_core::{load_config, ConfigError, DownloadError, GetCoub, GetCoubConfig};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Download(#[from] DownloadError),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Download a coub as a single looped video file", long_about = None)]
pub struct Cli {
    /// Coub page link, e.g. https://coub.com/view/dl5px
    pub link: String,
    /// Path to getcoub.toml
    #[arg(long, default_value = "configs/getcoub.toml")]
    pub config: PathBuf,
    /// Override the ffprobe binary
    #[arg(long)]
    pub ffprobe: Option<PathBuf>,
    /// Override the ffmpeg binary
    #[arg(long)]
    pub ffmpeg: Option<PathBuf>,
    /// Override the working directory for intermediates
    #[arg(long)]
    pub work_dir: Option<PathBuf>,
    /// Override the destination directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Output format for the final report
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub async fn run(cli: Cli) -> Result<PathBuf> {
    let config = effective_config(&cli)?;
    std::fs::create_dir_all(&config.paths.work_dir)?;
    std::fs::create_dir_all(&config.paths.output_dir)?;
    let downloader = GetCoub::new(config)?;
    let output = downloader.download(&cli.link).await?;
    Ok(output)
}

fn effective_config(cli: &Cli) -> Result<GetCoubConfig> {
    let mut config = load_config(&cli.config)?;
    if let Some(ffprobe) = &cli.ffprobe {
        config.tools.ffprobe = ffprobe.clone();
    }
    if let Some(ffmpeg) = &cli.ffmpeg {
        config.tools.ffmpeg = ffmpeg.clone();
    }
    if let Some(work_dir) = &cli.work_dir {
        config.paths.work_dir = work_dir.clone();
    }
    if let Some(output_dir) = &cli.output_dir {
        config.paths.output_dir = output_dir.clone();
    }
    Ok(config)
}
