//! Scope driven by a WAV file played back in real time.

use super::session::{load_config_or_report, run_session, ScopeOverrides};
use crate::capture::{FileCapture, LatestFrame};
use crate::ui;
use std::path::Path;

/// Paces `path` through the scope at its own sample rate.
///
/// The session stays open after the file ends so the trail can fade out;
/// the user quits with q.
///
/// # Errors
/// - If the configuration is invalid
/// - If the file cannot be decoded
/// - If the terminal session fails
pub async fn handle_replay(path: &Path, overrides: ScopeOverrides) -> anyhow::Result<()> {
    tracing::info!("=== radioscope replay: {} ===", path.display());

    let config = load_config_or_report()?;
    let settings = overrides.resolve(&config)?;

    let slot = LatestFrame::new();
    let mut capture = match FileCapture::open(path, config.audio.capture_size, slot.clone()) {
        Ok(capture) => capture,
        Err(err) => {
            return Err(ui::report(
                "Audio File Error",
                err,
                "Only PCM and float WAV files are supported.",
            ));
        }
    };

    run_session(&mut capture, &slot, settings, &config.display).await
}
