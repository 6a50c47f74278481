//! Application command handlers for radioscope.
//!
//! # Commands
//! - `live`: Scope of the configured input device
//! - `replay`: Scope of a WAV file played in real time
//! - `render`: Headless WAV-to-PNG rendering
//! - `config`: Open configuration file in user's preferred editor
//! - `list_devices`: List available audio input devices
//! - `logs`: Display recent log entries

pub mod config;
pub mod list_devices;
pub mod live;
pub mod logs;
pub mod render;
pub mod replay;
pub mod session;

pub use config::handle_config;
pub use list_devices::handle_list_devices;
pub use live::handle_live;
pub use logs::handle_logs;
pub use render::handle_render;
pub use replay::handle_replay;
pub use session::ScopeOverrides;
