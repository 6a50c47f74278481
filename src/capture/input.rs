//! Live waveform capture from an audio input device.
//!
//! The cpal callback mixes the device's interleaved input down to mono, cuts it
//! into fixed-size snapshots and publishes each one into the latest-frame slot.
//! Pointing this at a monitor/loopback device visualizes whatever the system
//! is playing.

use super::channel::{FramePublisher, LatestFrame};
use super::frame::FrameAssembler;
use super::WaveformSource;
use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Captures snapshots from a specified or default input device.
pub struct InputCapture {
    /// Device name, numeric index, or "default"
    device_name: String,
    /// Samples per published snapshot
    capture_size: usize,
    publisher: FramePublisher,
    /// Active input stream (kept alive while capturing)
    stream: Option<cpal::Stream>,
    /// Sample rate reported by the device once started
    sample_rate: Option<u32>,
}

impl InputCapture {
    pub fn new(device_name: String, capture_size: usize, slot: LatestFrame) -> Self {
        Self {
            device_name,
            capture_size,
            publisher: FramePublisher::new(slot),
            stream: None,
            sample_rate: None,
        }
    }

    /// Sample rate of the running stream, if started.
    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    fn open_stream(&mut self) -> Result<cpal::Stream> {
        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();

            if self.device_name == "default" {
                host.default_input_device()
                    .ok_or_else(|| anyhow!("No audio input device available"))
            } else {
                find_device_by_name(&host, &self.device_name)
            }
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Capture device: {}", device_name);

        let supported = device.default_input_config()?;
        let sample_format = supported.sample_format();
        let channels = supported.channels() as usize;
        self.sample_rate = Some(supported.sample_rate().0);

        tracing::debug!(
            "Device configuration: {}Hz, {} channels, {:?}, {} samples per snapshot",
            supported.sample_rate().0,
            channels,
            sample_format,
            self.capture_size
        );

        let config: cpal::StreamConfig = supported.into();
        let publisher = self.publisher.clone();
        let mut assembler = FrameAssembler::new(self.capture_size, channels);
        let on_error = |err: cpal::StreamError| tracing::error!("Audio stream error: {}", err);

        let stream = match sample_format {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    assembler.push_interleaved(data, |frame| publisher.publish(frame));
                },
                on_error,
                None,
            )?,
            SampleFormat::I16 => {
                let mut scratch = Vec::new();
                device.build_input_stream(
                    &config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        scratch.clear();
                        scratch.extend(data.iter().map(|&s| s as f32 / 32768.0));
                        assembler.push_interleaved(&scratch, |frame| publisher.publish(frame));
                    },
                    on_error,
                    None,
                )?
            }
            SampleFormat::U16 => {
                let mut scratch = Vec::new();
                device.build_input_stream(
                    &config,
                    move |data: &[u16], _: &cpal::InputCallbackInfo| {
                        scratch.clear();
                        scratch.extend(data.iter().map(|&s| (s as f32 - 32768.0) / 32768.0));
                        assembler.push_interleaved(&scratch, |frame| publisher.publish(frame));
                    },
                    on_error,
                    None,
                )?
            }
            other => {
                return Err(anyhow!("Unsupported input sample format: {other:?}"));
            }
        };

        Ok(stream)
    }
}

impl WaveformSource for InputCapture {
    /// Opens the stream on first use, resumes it afterwards.
    ///
    /// # Errors
    /// - If the configured device is not available
    /// - If the device uses an unsupported sample format
    /// - If stream creation or start fails
    fn start(&mut self) -> Result<()> {
        self.publisher.enable();

        if let Some(stream) = &self.stream {
            stream.play()?;
            tracing::debug!("Capture resumed");
            return Ok(());
        }

        let stream = self.open_stream()?;
        stream.play()?;
        self.stream = Some(stream);
        tracing::debug!("Capture stream started");
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stream) = &self.stream {
            if let Err(e) = stream.pause() {
                tracing::debug!("Failed to pause capture stream: {}", e);
            }
        }
        self.publisher.disable();
        tracing::debug!("Capture stopped");
    }

    fn is_running(&self) -> bool {
        self.stream.is_some() && self.publisher.is_enabled()
    }

    fn describe(&self) -> String {
        format!("input:{}", self.device_name)
    }
}

impl Drop for InputCapture {
    fn drop(&mut self) {
        self.stream = None;
        self.publisher.disable();
    }
}

/// Finds an audio input device by name or numeric index.
///
/// # Errors
/// - If no device with the specified name/index is found
pub fn find_device_by_name(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device> {
    let devices: Vec<_> = host
        .input_devices()
        .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?
        .collect();

    if let Ok(index) = device_spec.parse::<usize>() {
        let count = devices.len();
        return devices.into_iter().nth(index).ok_or_else(|| {
            anyhow!(
                "Device index {} is out of range (0-{})",
                index,
                count.saturating_sub(1)
            )
        });
    }

    devices
        .into_iter()
        .find(|device| device.name().is_ok_and(|name| name == device_spec))
        .ok_or_else(|| {
            anyhow!(
                "Audio input device '{device_spec}' not found. Use 'radioscope list-devices' to see available devices."
            )
        })
}

/// Temporarily redirects stderr to /dev/null to suppress ALSA library warnings on Linux.
#[cfg(target_os = "linux")]
pub fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let dev_null = OpenOptions::new()
        .write(true)
        .open("/dev/null")
        .map_err(|e| anyhow!("Failed to open /dev/null: {e}"))?;

    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return Err(anyhow!("Failed to duplicate stderr"));
    }

    if unsafe { libc::dup2(dev_null.as_raw_fd(), libc::STDERR_FILENO) } == -1 {
        unsafe { libc::close(old_stderr) };
        return Err(anyhow!("Failed to redirect stderr"));
    }

    let result = f();

    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

#[cfg(not(target_os = "linux"))]
pub fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    f()
}
