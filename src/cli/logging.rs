//! Logging initialization

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Initialize logging based on debug flag
///
/// With `debug`, everything at debug level goes to a temp file whose path is
/// returned, keeping stdout clean for JSON output. Otherwise warnings go to
/// stderr, filtered by `RUST_LOG`.
pub fn init_logging(debug: bool) -> Option<PathBuf> {
    if !debug {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_target(false)
            .init();
        return None;
    }

    let log_path = tempfile::Builder::new()
        .prefix("topomap-")
        .suffix(".log")
        .tempfile()
        .and_then(|f| f.keep().map_err(|e| e.error))
        .map(|(_, path)| path)
        .unwrap_or_else(|_| {
            std::env::temp_dir().join(format!("topomap-{}.log", std::process::id()))
        });

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Cannot open log file {}: {}", log_path.display(), e);
            return None;
        }
    };

    tracing_subscriber::fmt()
        .with_writer(file)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    Some(log_path)
}
