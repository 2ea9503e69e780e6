use anyhow::{Context, Result};
use beatscene_core::LogConfig;
use std::fs::File;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, registry::Registry, util::SubscriberInitExt,
    Layer,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps the file writer thread alive; drop it last
pub struct LogGuard {
    _guard: WorkerGuard,
}

/// Install the global subscriber.
///
/// Console output goes to stderr so stdout stays clean for JSON.
pub fn init(config: &LogConfig) -> Result<Option<LogGuard>> {
    let (layers, guard) = build_layers(config)?;
    tracing_subscriber::registry().with(layers).init();

    tracing::debug!(level = %config.level, "Logging initialized");
    Ok(guard)
}

/// One layer per enabled output, each behind its own level filter
fn build_layers(config: &LogConfig) -> Result<(Vec<BoxedLayer>, Option<LogGuard>)> {
    // RUST_LOG wins over the configured level
    let filter = || {
        EnvFilter::builder()
            .with_default_directive(config.parse_level().into())
            .from_env_lossy()
    };

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if config.console_output {
        layers.push(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(filter())
                .boxed(),
        );
    }

    if !config.file_output {
        return Ok((layers, None));
    }

    config
        .ensure_log_directory()
        .context("Failed to create log directory")?;
    if let Err(e) = config.cleanup_old_logs() {
        eprintln!("Warning: Failed to clean up old log files: {}", e);
    }

    let log_path = config.current_log_path();
    let file = File::create(&log_path)
        .with_context(|| format!("Failed to create log file: {:?}", log_path))?;
    eprintln!("Logging to {:?}", log_path);

    let (writer, worker_guard) = tracing_appender::non_blocking(file);
    layers.push(
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(filter())
            .boxed(),
    );

    Ok((layers, Some(LogGuard { _guard: worker_guard })))
}
