use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";

/// Install the global fmt subscriber. Logs go to stderr so stdout only carries
/// the retrieval results, prompt and answer.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Wall-clock timer for a single pipeline stage.
pub struct Telemetry {
    stage: &'static str,
    start: Instant,
}

impl Telemetry {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Log the stage as finished and return how long it took.
    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        tracing::info!(
            stage = self.stage,
            elapsed_ms = elapsed.as_millis() as u64,
            "stage complete"
        );
        elapsed
    }
}
