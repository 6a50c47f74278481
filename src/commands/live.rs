//! Live scope of an audio input device.

use super::session::{load_config_or_report, run_session, ScopeOverrides};
use crate::capture::{InputCapture, LatestFrame, WaveformSource};
use crate::ui;

/// Visualizes the configured input device until the user quits.
///
/// # Errors
/// - If the configuration is invalid
/// - If the input device cannot be opened
/// - If the terminal session fails
pub async fn handle_live(overrides: ScopeOverrides) -> anyhow::Result<()> {
    tracing::info!("=== radioscope live session ===");

    let config = load_config_or_report()?;
    let settings = overrides.resolve(&config)?;

    tracing::info!(
        "Configuration loaded: device={}, capture_size={}, fps={}",
        config.audio.device,
        config.audio.capture_size,
        config.display.fps
    );

    let slot = LatestFrame::new();
    let mut capture = InputCapture::new(
        config.audio.device.clone(),
        config.audio.capture_size,
        slot.clone(),
    );

    // Open the device before the scope takes the screen so failures are readable.
    if let Err(err) = capture.start() {
        return Err(ui::report(
            "Audio Input Error",
            err,
            "Run 'radioscope list-devices' and set [audio] device in the config.",
        ));
    }
    if let Some(rate) = capture.sample_rate() {
        tracing::info!("Capturing at {}Hz", rate);
    }

    run_session(&mut capture, &slot, settings, &config.display).await
}
