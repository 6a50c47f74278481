//! Configuration management for radioscope.
//!
//! Loads and saves the TOML configuration file in the user's config directory.

pub mod file;

pub use file::{get_config_path, ConfigError, DisplayConfig, ScopeConfig};
