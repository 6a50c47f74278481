//! Display recent log entries from the application.

use crate::logging::{get_log_dir, LOG_FILE_PREFIX};
use anyhow::anyhow;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_LINES: usize = 50;

/// Prints the last lines of the most recent log file.
///
/// # Errors
/// - If the log directory cannot be determined
/// - If log files cannot be read
pub fn handle_logs() -> Result<(), anyhow::Error> {
    let log_dir = get_log_dir()?;

    let Some(log_file) = find_latest_log(&log_dir)? else {
        println!("No log files found in: {}", log_dir.display());
        println!("Run 'radioscope' to generate logs.");
        return Ok(());
    };

    let content =
        fs::read_to_string(&log_file).map_err(|e| anyhow!("Failed to read log file: {e}"))?;

    if content.is_empty() {
        println!("Log file is empty: {}", log_file.display());
        return Ok(());
    }

    let lines: Vec<&str> = content.lines().collect();
    let tail = last_lines(&lines, DEFAULT_LINES);

    println!();
    if tail.len() < lines.len() {
        println!("Showing last {} of {} lines:", tail.len(), lines.len());
    } else {
        println!("Showing all {} lines:", lines.len());
    }
    println!("Full log file at: {}", log_file.display());
    println!();

    for line in tail {
        println!("{line}");
    }

    Ok(())
}

fn last_lines<'a>(lines: &'a [&'a str], count: usize) -> &'a [&'a str] {
    &lines[lines.len().saturating_sub(count)..]
}

/// Most recently modified radioscope log file in `log_dir`, if any.
fn find_latest_log(log_dir: &Path) -> Result<Option<PathBuf>, anyhow::Error> {
    let entries =
        fs::read_dir(log_dir).map_err(|e| anyhow!("Failed to read log directory: {e}"))?;

    let mut latest: Option<(PathBuf, std::time::SystemTime)> = None;

    for entry in entries {
        let path = entry
            .map_err(|e| anyhow!("Failed to read directory entry: {e}"))?
            .path();

        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX));
        if !is_log {
            continue;
        }

        let Ok(modified) = fs::metadata(&path).and_then(|m| m.modified()) else {
            continue;
        };
        if latest.as_ref().is_none_or(|(_, newest)| modified > *newest) {
            latest = Some((path, modified));
        }
    }

    Ok(latest.map(|(path, _)| path))
}
