//! List available audio input devices.

use crate::capture::input::suppress_alsa_warnings;
use anyhow::anyhow;
use cpal::traits::{DeviceTrait, HostTrait};

/// Lists all input devices with the index and name accepted by `[audio] device`.
///
/// # Errors
/// - If the audio host cannot enumerate devices
pub fn handle_list_devices() -> Result<(), anyhow::Error> {
    let (host, devices) = suppress_alsa_warnings(|| {
        let host = cpal::default_host();
        let devices: Vec<cpal::Device> = host
            .input_devices()
            .map_err(|e| anyhow!("Failed to enumerate audio devices: {e}"))?
            // Skip devices that cannot even report a name
            .filter(|d| d.name().is_ok())
            .collect();
        Ok((host, devices))
    })?;

    if devices.is_empty() {
        println!("No audio input devices found on this system.");
        return Ok(());
    }

    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    println!();
    println!("Available audio input devices:");
    println!();

    for (index, device) in devices.iter().enumerate() {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let default_indicator = if default_name.as_ref() == Some(&name) {
            " [DEFAULT]"
        } else {
            ""
        };
        let monitor_hint = if is_monitor_name(&name) {
            " (plays back system audio)"
        } else {
            ""
        };

        let config_info = match device.default_input_config() {
            Ok(config) => format!(
                " ({}Hz, {} channels, {:?})",
                config.sample_rate().0,
                config.channels(),
                config.sample_format()
            ),
            Err(_) => " (configuration unavailable)".to_string(),
        };

        println!("  ID: {index}");
        println!("    Name: {name}{default_indicator}{monitor_hint}");
        println!("    Config:{config_info}");
        println!();
    }

    println!("Set [audio] device in ~/.config/radioscope/radioscope.toml to an ID or name.");
    Ok(())
}

/// Loopback sources show what the system is playing rather than a microphone.
fn is_monitor_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    ["monitor", "loopback", "stereo mix", "blackhole"]
        .iter()
        .any(|hint| lower.contains(hint))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_names() {
        assert!(is_monitor_name("Monitor of Built-in Audio Analog Stereo"));
        assert!(is_monitor_name("BlackHole 2ch"));
        assert!(is_monitor_name("Stereo Mix (Realtek Audio)"));
        assert!(!is_monitor_name("USB Microphone"));
    }
}
