//! Interactive scope session shared by the `live` and `replay` commands.
//!
//! A tokio interval drives the render clock. On each tick the loop handles
//! input, reads the newest snapshot from the slot, runs one scope tick and
//! redraws the terminal. Slow ticks are skipped rather than queued.

use crate::capture::{LatestFrame, WaveformSource};
use crate::config::{ConfigError, DisplayConfig, ScopeConfig};
use crate::scope::{RenderMode, Scope, ScopeSettings};
use crate::ui::{ScopeCommand, ScopeTui, StatusLine};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Tension change per key press.
pub const TENSION_STEP: f32 = 0.05;

/// Command line overrides for the visualizer section of the config.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScopeOverrides {
    pub mode: Option<RenderMode>,
    pub tension: Option<f32>,
}

impl ScopeOverrides {
    /// Settings from `config` with the overrides applied.
    ///
    /// # Errors
    /// - If the overridden tension is outside `0.0..=1.0`
    pub fn resolve(&self, config: &ScopeConfig) -> anyhow::Result<ScopeSettings> {
        let mut settings = config.scope_settings();
        if let Some(mode) = self.mode {
            settings.mode = mode;
        }
        if let Some(tension) = self.tension {
            if !(0.0..=1.0).contains(&tension) {
                return Err(ConfigError::Tension(tension).into());
            }
            settings.tension = tension;
        }
        Ok(settings)
    }
}

/// Loads the config, showing an error screen if it is unusable.
///
/// # Errors
/// - If the config cannot be read, parsed or validated
pub fn load_config_or_report() -> anyhow::Result<ScopeConfig> {
    ScopeConfig::load_or_init().map_err(|err| {
        crate::ui::report(
            "Configuration Error",
            err,
            "Check ~/.config/radioscope/radioscope.toml or run 'radioscope config'.",
        )
    })
}

/// Applies a settings key to `settings`. Returns true if anything changed.
pub fn adjust_settings(settings: &mut ScopeSettings, command: ScopeCommand) -> bool {
    match command {
        ScopeCommand::ToggleMode => {
            settings.mode = settings.mode.toggled();
            tracing::info!("Render mode: {}", settings.mode);
            true
        }
        ScopeCommand::TensionUp | ScopeCommand::TensionDown => {
            let step = if command == ScopeCommand::TensionUp {
                TENSION_STEP
            } else {
                -TENSION_STEP
            };
            // Round to the step grid so repeated presses land on 0.0 and 1.0 exactly.
            let stepped = ((settings.tension + step) / TENSION_STEP).round() * TENSION_STEP;
            let tension = stepped.clamp(0.0, 1.0);
            let changed = tension != settings.tension;
            settings.tension = tension;
            changed
        }
        _ => false,
    }
}

/// Render clock period for the configured frame rate.
pub fn tick_period(display_config: &DisplayConfig) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(display_config.fps.max(1)))
}

/// Runs the scope full-screen until the user quits or SIGTERM arrives.
///
/// `source` is started here and stopped before returning.
///
/// # Errors
/// - If the terminal cannot be initialized or drawn
/// - If the source fails to start or resume
pub async fn run_session(
    source: &mut dyn WaveformSource,
    slot: &LatestFrame,
    mut settings: ScopeSettings,
    display_config: &DisplayConfig,
) -> anyhow::Result<()> {
    let term = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&term))
        .map_err(|e| anyhow::anyhow!("Failed to register signal handler: {e}"))?;

    source.start()?;
    let label = source.describe();
    let fps = display_config.fps;
    tracing::info!("Session started: {label}, mode={}, fps={}", settings.mode, fps);

    let mut tui = ScopeTui::new(display_config.pixels_per_cell)?;
    let mut scope = Scope::new(&settings);

    let mut clock = tokio::time::interval(tick_period(display_config));
    clock.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut tick_count = 0u64;
    let mut surface_failures = 0u64;

    let outcome: anyhow::Result<()> = loop {
        clock.tick().await;

        if term.load(Ordering::Relaxed) {
            tracing::info!("Received SIGTERM: ending session");
            break Ok(());
        }

        match tui.handle_input() {
            Ok(ScopeCommand::Quit) => break Ok(()),
            Ok(ScopeCommand::TogglePlayback) => {
                if let Err(e) = source.toggle() {
                    break Err(e);
                }
                tracing::info!(
                    "Playback {}",
                    if source.is_running() { "resumed" } else { "paused" }
                );
            }
            Ok(command) => {
                adjust_settings(&mut settings, command);
            }
            Err(e) => break Err(e),
        }

        let size = match tui.canvas_size() {
            Ok(size) => size,
            Err(e) => break Err(e),
        };
        let frame = slot.latest();

        match scope.on_tick(frame.as_deref(), size, &settings) {
            Ok(report) => {
                tick_count += 1;
                if tick_count.is_multiple_of(60) {
                    tracing::debug!(
                        ticks = tick_count,
                        envelope = scope.envelope(),
                        gain = report.gain,
                        fade_alpha = report.fade_alpha,
                        has_frame = report.analysis.is_some(),
                        "scope running"
                    );
                }
            }
            Err(e) => {
                surface_failures += 1;
                if surface_failures == 1 || surface_failures.is_multiple_of(100) {
                    tracing::warn!("Skipping tick ({surface_failures} so far): {e}");
                }
            }
        }

        let status = StatusLine {
            mode: settings.mode,
            playing: source.is_running(),
            tension: settings.tension,
            gain: scope.gain(),
            source: &label,
        };
        if let Err(e) = tui.render(scope.present(), &status) {
            break Err(e);
        }
    };

    source.stop();
    tui.cleanup()?;
    tracing::info!("Session ended after {tick_count} ticks");
    outcome
}
