pub mod command;
pub mod config;
pub mod downloader;
pub mod error;
pub mod fetch;
pub mod notify;
pub mod probe;
pub mod remux;

pub use command::{CommandExecutor, SystemCommandExecutor};
pub use config::{load_config, GetCoubConfig, NetworkSection, PathsSection, ToolsSection};
pub use downloader::{DownloadError, DownloadResult, GetCoub};
pub use error::{ConfigError, Result};
pub use fetch::{coub_id_from_link, CoubClient, CoubSources, FetchError, FetchResult};
pub use notify::{NullObserver, PipelineObserver, TracingObserver};
pub use probe::{
    parse_fps, MediaKind, MediaProber, ProbeError, ProbeResult, StreamDescriptor, StreamDetails,
};
pub use remux::{loops_count, manifest_contents, RemuxError, RemuxJob, RemuxPipeline, RemuxResult};
