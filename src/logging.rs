use anyhow::{anyhow, Context, Result};
use once_cell::sync::OnceCell;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Builds the level filter. When debug logging is disabled the level is fixed
/// at `info` regardless of `RUST_LOG`.
pub fn env_filter(debug: bool) -> EnvFilter {
    if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    }
}

/// Initialise logging to stderr, and to `log_file` as well when one is given.
/// Calling this again after a subscriber is installed does nothing.
pub fn init(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(debug));

    let Some(path) = log_file else {
        let _ = builder.try_init();
        return Ok(());
    };

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("log file path has no file name: {}", path.display()))?;
    std::fs::create_dir_all(directory)
        .with_context(|| format!("create log folder {}", directory.display()))?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    if FILE_GUARD.set(guard).is_err() {
        tracing::debug!("file logging already initialised");
        return Ok(());
    }

    let _ = builder
        .with_writer(std::io::stderr.and(writer))
        .with_ansi(false)
        .try_init();
    Ok(())
}
