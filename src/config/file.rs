//! Configuration file management for radioscope.
//!
//! Settings live in a TOML file in the user's config directory. The file is
//! created with defaults on first run and validated on every load.

use crate::scope::{RenderMode, ScopeSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Current application version from Cargo.toml
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A configuration value outside its allowed range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("visualizer.tension must be between 0.0 and 1.0 (got {0})")]
    Tension(f32),
    #[error("visualizer gain band is invalid: min_gain = {min}, max_gain = {max} (need 0 <= min_gain <= max_gain)")]
    GainBand { min: f32, max: f32 },
    #[error("audio.capture_size must be at least 2 (got {0})")]
    CaptureSize(usize),
    #[error("display.fps must be between 1 and 240 (got {0})")]
    Fps(u32),
    #[error("display.pixels_per_cell must be between 1 and 16 (got {0})")]
    PixelsPerCell(u32),
}

/// Curve and gain settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisualizerConfig {
    /// "attractor" (Lissajous loop) or "time-domain" (oscilloscope trace)
    #[serde(default)]
    pub mode: RenderMode,
    /// Interpolation tension for the time-domain trace (0.0 straight, 1.0 ringing)
    #[serde(default = "default_tension")]
    pub tension: f32,
    /// Lower bound of the auto-gain multiplier
    #[serde(default = "default_min_gain")]
    pub min_gain: f32,
    /// Upper bound of the auto-gain multiplier
    #[serde(default = "default_max_gain")]
    pub max_gain: f32,
    /// Add high-frequency shimmer to the attractor loop
    #[serde(default = "default_true")]
    pub shimmer: bool,
}

fn default_tension() -> f32 {
    0.5
}

fn default_min_gain() -> f32 {
    0.5
}

fn default_max_gain() -> f32 {
    6.0
}

fn default_true() -> bool {
    true
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            mode: RenderMode::default(),
            tension: default_tension(),
            min_gain: default_min_gain(),
            max_gain: default_max_gain(),
            shimmer: true,
        }
    }
}

/// Waveform capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `radioscope list-devices`
    /// - device name from `radioscope list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// Samples per waveform snapshot
    #[serde(default = "default_capture_size")]
    pub capture_size: usize,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_capture_size() -> usize {
    1024
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            capture_size: default_capture_size(),
        }
    }
}

/// Terminal presentation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    /// Render clock rate in frames per second
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Surface pixels per terminal column (rows get twice as many)
    #[serde(default = "default_pixels_per_cell")]
    pub pixels_per_cell: u32,
}

fn default_fps() -> u32 {
    60
}

fn default_pixels_per_cell() -> u32 {
    4
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            pixels_per_cell: default_pixels_per_cell(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScopeConfig {
    /// Version of radioscope that wrote the file
    #[serde(default)]
    pub config_version: Option<String>,
    #[serde(default)]
    pub visualizer: VisualizerConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            config_version: Some(CURRENT_VERSION.to_string()),
            visualizer: VisualizerConfig::default(),
            audio: AudioConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl ScopeConfig {
    /// Loads the user's configuration, writing defaults first if none exists.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the file cannot be read or written
    /// - If the TOML is malformed or a value is out of range
    pub fn load_or_init() -> anyhow::Result<Self> {
        let config_path = get_config_path()?;
        if !config_path.exists() {
            tracing::info!("No config found, writing defaults to {}", config_path.display());
            let config = ScopeConfig::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }
        Self::load_from(&config_path)
    }

    /// Loads and validates configuration from `path`.
    ///
    /// # Errors
    /// - If the file cannot be read
    /// - If the TOML is malformed or a value is out of range
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
        let config: ScopeConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {e}", path.display()))?;
        config.validate()?;

        match config.config_version.as_deref() {
            Some(CURRENT_VERSION) => {}
            Some(other) => tracing::info!(
                "Config written by version {} (running {})",
                other,
                CURRENT_VERSION
            ),
            None => tracing::debug!("Config has no version line"),
        }

        Ok(config)
    }

    /// Writes this configuration to `path`, creating parent directories.
    ///
    /// # Errors
    /// - If the directory cannot be created or the file cannot be written
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Checks every value against its allowed range.
    ///
    /// # Errors
    /// - The first out-of-range value found
    pub fn validate(&self) -> Result<(), ConfigError> {
        let v = &self.visualizer;
        if !(0.0..=1.0).contains(&v.tension) {
            return Err(ConfigError::Tension(v.tension));
        }
        if !crate::scope::GainBand::new(v.min_gain, v.max_gain).is_valid() {
            return Err(ConfigError::GainBand {
                min: v.min_gain,
                max: v.max_gain,
            });
        }
        if self.audio.capture_size < 2 {
            return Err(ConfigError::CaptureSize(self.audio.capture_size));
        }
        if !(1..=240).contains(&self.display.fps) {
            return Err(ConfigError::Fps(self.display.fps));
        }
        if !(1..=16).contains(&self.display.pixels_per_cell) {
            return Err(ConfigError::PixelsPerCell(self.display.pixels_per_cell));
        }
        Ok(())
    }

    /// Per-tick scope settings derived from the visualizer section.
    pub fn scope_settings(&self) -> ScopeSettings {
        ScopeSettings {
            mode: self.visualizer.mode,
            tension: self.visualizer.tension,
            min_gain: self.visualizer.min_gain,
            max_gain: self.visualizer.max_gain,
            shimmer: self.visualizer.shimmer,
        }
    }
}

/// Retrieves the path to the config file.
///
/// # Errors
/// - If the home directory cannot be determined
pub fn get_config_path() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(home.join(".config").join("radioscope").join("radioscope.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScopeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.visualizer.mode, RenderMode::Attractor);
        assert_eq!(config.audio.capture_size, 1024);
        assert_eq!(config.display.fps, 60);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: ScopeConfig = toml::from_str(
            r#"
            [visualizer]
            mode = "time-domain"
            tension = 0.8
            "#,
        )
        .unwrap();

        assert_eq!(config.visualizer.mode, RenderMode::TimeDomain);
        assert_eq!(config.visualizer.tension, 0.8);
        assert_eq!(config.visualizer.max_gain, 6.0);
        assert!(config.visualizer.shimmer);
        assert_eq!(config.audio.device, "default");
        assert_eq!(config.config_version, None);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("radioscope.toml");

        let mut config = ScopeConfig::default();
        config.visualizer.mode = RenderMode::TimeDomain;
        config.audio.device = "2".to_string();
        config.save_to(&path).unwrap();

        let loaded = ScopeConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_crossed_gain_band_rejected() {
        let mut config = ScopeConfig::default();
        config.visualizer.min_gain = 5.0;
        config.visualizer.max_gain = 1.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::GainBand { min: 5.0, max: 1.0 })
        );
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let mut config = ScopeConfig::default();
        config.visualizer.tension = 1.5;
        assert_eq!(config.validate(), Err(ConfigError::Tension(1.5)));

        let mut config = ScopeConfig::default();
        config.audio.capture_size = 1;
        assert_eq!(config.validate(), Err(ConfigError::CaptureSize(1)));

        let mut config = ScopeConfig::default();
        config.display.fps = 0;
        assert_eq!(config.validate(), Err(ConfigError::Fps(0)));

        let mut config = ScopeConfig::default();
        config.display.pixels_per_cell = 0;
        assert_eq!(config.validate(), Err(ConfigError::PixelsPerCell(0)));
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("radioscope.toml");
        fs::write(&path, "[visualizer]\nmode = \"spiral\"\n").unwrap();

        let err = ScopeConfig::load_from(&path).unwrap_err().to_string();
        assert!(err.contains("radioscope.toml"));
    }

    #[test]
    fn test_scope_settings_mirror_visualizer() {
        let mut config = ScopeConfig::default();
        config.visualizer.shimmer = false;
        config.visualizer.tension = 0.25;

        let settings = config.scope_settings();
        assert!(!settings.shimmer);
        assert_eq!(settings.tension, 0.25);
        assert_eq!(settings.gain_band().max, 6.0);
    }
}
