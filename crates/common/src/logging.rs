use std::path::Path;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::error::{Error, Result};

fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `log_level`. When `log_dir` is given a
/// daily-rolling `flagship.log` is written there alongside console output.
pub fn init_logging(log_level: &str, log_dir: Option<&Path>) -> Result<()> {
    let console_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(env_filter(log_level));

    let file_layer = log_dir.map(|dir| {
        let file_appender = tracing_appender::rolling::daily(dir, "flagship.log");
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .with_writer(file_appender)
            .with_filter(env_filter(log_level))
    });

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::internal(format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}
