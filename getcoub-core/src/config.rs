use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Top-level configuration for a download run. Everything the pipeline used
/// to derive at startup (tool locations, temp and destination directories)
/// is explicit here so callers and tests can point it anywhere.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GetCoubConfig {
    pub tools: ToolsSection,
    pub paths: PathsSection,
    pub network: NetworkSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    pub ffprobe: PathBuf,
    pub ffmpeg: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    /// Scratch directory holding downloaded sources and intermediates.
    pub work_dir: PathBuf,
    /// User-facing destination for the final muxed file.
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkSection {
    pub user_agent: String,
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GetCoubConfig> {
    load_toml(path)
}

fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_fixture_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../configs/getcoub.toml");
        let config = load_config(path).expect("config should parse");
        assert_eq!(config.tools.ffprobe, PathBuf::from("ffprobe"));
        assert_eq!(config.tools.ffmpeg, PathBuf::from("ffmpeg"));
        assert_eq!(config.paths.work_dir, PathBuf::from("temp"));
        assert!(!config.network.user_agent.is_empty());
    }

    #[test]
    fn missing_config_reports_path() {
        let err = load_config("does/not/exist.toml").unwrap_err();
        match err {
            ConfigError::Io { path, .. } => {
                assert!(path.ends_with("exist.toml"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
