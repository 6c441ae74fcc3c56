//! File-based logging; the terminal belongs to the UI.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "moodtui";

/// Logs go to `<log_dir>/moodtui.YYYY-MM-DD` with daily rotation. `RUST_LOG`
/// overrides the default filter.
pub fn init_logging(log_dir: &str) -> anyhow::Result<()> {
    let dir = Path::new(log_dir);
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    // flushed on exit only while the guard lives
    Box::leak(Box::new(guard));

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("moodtui=debug,moodlift=debug,moodconfig=debug,warn"));

    let fmt_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();

    tracing::info!(log_dir, "logging initialized");
    Ok(())
}
