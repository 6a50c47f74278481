//! Structured logging for radioscope using the tracing crate.
//!
//! Log lines go to a daily-rotated file under the XDG state directory, never
//! to the terminal, since the scope owns the whole screen while running.
//! Old files are pruned at startup so only the most recent week is kept.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_appender::rolling;
use tracing_subscriber::prelude::*;

/// Base name of the rolling log file; rotated files get a `.YYYY-MM-DD` suffix.
pub const LOG_FILE_PREFIX: &str = "radioscope.log";

const MAX_LOG_FILES: usize = 7;

/// Keeps the non-blocking writer flushing until the process exits.
static APPENDER_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Initializes the logging system with file-based output.
///
/// Log level is controlled by the RUST_LOG environment variable (defaults to "info").
///
/// # Errors
/// - If the log directory cannot be determined or created
/// - If logging was already initialized
pub fn init_logging() -> Result<(), anyhow::Error> {
    let log_dir = get_log_dir()?;

    if let Err(e) = cleanup_old_logs(&log_dir) {
        eprintln!("Warning: Failed to cleanup old logs: {e}");
    }

    let file_appender = rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    APPENDER_GUARD
        .set(guard)
        .map_err(|_| anyhow::anyhow!("Logging already initialized"))?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_ansi(false),
        )
        .init();

    tracing::debug!("Logging initialized. Log dir: {}", log_dir.display());
    Ok(())
}

/// Determines the log directory, creating it if needed.
///
/// Prefers `$XDG_STATE_HOME/radioscope`, otherwise `~/.local/state/radioscope`.
///
/// # Errors
/// - If home directory cannot be determined
/// - If log directory cannot be created
pub fn get_log_dir() -> Result<PathBuf, anyhow::Error> {
    let log_dir = match std::env::var("XDG_STATE_HOME") {
        Ok(xdg_state) if !xdg_state.is_empty() => PathBuf::from(xdg_state).join("radioscope"),
        _ => {
            let home = dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
            home.join(".local/state/radioscope")
        }
    };

    fs::create_dir_all(&log_dir)?;
    Ok(log_dir)
}

/// True for rotated files named `radioscope.log.YYYY-MM-DD`.
fn is_rotated_log(file_name: &str) -> bool {
    file_name
        .strip_prefix(LOG_FILE_PREFIX)
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|date| date.matches('-').count() == 2)
}

/// Removes rotated log files beyond the newest [`MAX_LOG_FILES`].
///
/// # Errors
/// - If the log directory cannot be read
fn cleanup_old_logs(log_dir: &Path) -> Result<(), anyhow::Error> {
    let mut log_files: Vec<_> = fs::read_dir(log_dir)?
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let file_name = path.file_name()?.to_string_lossy().to_string();
            if !is_rotated_log(&file_name) {
                return None;
            }
            let modified = fs::metadata(&path).ok()?.modified().ok()?;
            Some((path, modified))
        })
        .collect();

    // Newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    for (path, _) in log_files.iter().skip(MAX_LOG_FILES) {
        if let Err(e) = fs::remove_file(path) {
            tracing::warn!("Failed to delete old log file {}: {}", path.display(), e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    #[test]
    fn test_rotated_log_names() {
        assert!(is_rotated_log("radioscope.log.2026-10-18"));
        assert!(!is_rotated_log("radioscope.log"));
        assert!(!is_rotated_log("other.log.2026-10-18"));
        assert!(!is_rotated_log("radioscope.toml"));
    }

    #[test]
    fn test_cleanup_keeps_newest_week() {
        let dir = tempfile::tempdir().unwrap();
        let base = SystemTime::now() - Duration::from_secs(30 * 86_400);

        for day in 1..=10u64 {
            let path = dir.path().join(format!("radioscope.log.2026-10-{day:02}"));
            let file = fs::File::create(&path).unwrap();
            file.set_modified(base + Duration::from_secs(day * 86_400))
                .unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        cleanup_old_logs(dir.path()).unwrap();

        let mut remaining: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        remaining.sort();

        assert_eq!(remaining.len(), MAX_LOG_FILES + 1);
        assert!(remaining.contains(&"notes.txt".to_string()));
        assert!(!remaining.contains(&"radioscope.log.2026-10-01".to_string()));
        assert!(remaining.contains(&"radioscope.log.2026-10-10".to_string()));
    }
}
