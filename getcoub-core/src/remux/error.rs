use std::path::PathBuf;

use thiserror::Error;

use crate::probe::ProbeError;

/// Every remux error is terminal for the run; the message prefix names the
/// failing stage for the error notification channel.
#[derive(Debug, Error)]
pub enum RemuxError {
    #[error("error while extracting video info: {0}")]
    VideoProbe(#[source] ProbeError),
    #[error("error while extracting audio info: {0}")]
    AudioProbe(#[source] ProbeError),
    #[error("error while making .ts file: {0}")]
    Transcode(String),
    #[error("error while merging videos: {0}")]
    Concat(String),
    #[error("error while adding sound: {0}")]
    Mux(String),
    #[error("io error at {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
}

pub type RemuxResult<T> = Result<T, RemuxError>;
