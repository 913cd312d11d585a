use std::path::Path;

use tracing::{error, info};

/// The three notification channels of a download run: progress messages are
/// emitted several times per run, completion exactly once on success, error
/// exactly once on failure.
pub trait PipelineObserver: Send + Sync {
    fn progress(&self, message: &str);
    fn completed(&self, output: &Path);
    fn error(&self, message: &str);
}

/// Default observer routing everything through `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn progress(&self, message: &str) {
        info!("{message}");
    }

    fn completed(&self, output: &Path) {
        info!(output = %output.display(), "coub saved");
    }

    fn error(&self, message: &str) {
        error!("{message}");
    }
}

#[derive(Debug, Default)]
pub struct NullObserver;

impl PipelineObserver for NullObserver {
    fn progress(&self, _message: &str) {}

    fn completed(&self, _output: &Path) {}

    fn error(&self, _message: &str) {}
}
