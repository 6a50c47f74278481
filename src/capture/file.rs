//! Waveform source that paces a PCM WAV file in real time.
//!
//! The whole file is decoded into mono `f32` up front; a background thread then
//! publishes one snapshot per `capture_size / sample_rate` seconds, the same
//! cadence a live device would deliver.

use super::channel::{FramePublisher, LatestFrame};
use super::frame::WaveformFrame;
use super::WaveformSource;
use anyhow::{anyhow, Result};
use hound::{SampleFormat, WavReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Mono PCM decoded from a WAV file, normalized to `[-1.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct MonoPcm {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl MonoPcm {
    /// Reads a WAV file and mixes all channels down to mono.
    ///
    /// # Errors
    /// - If the file cannot be opened or is not a valid WAV file
    /// - If the sample data is truncated or malformed
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = WavReader::open(path)
            .map_err(|e| anyhow!("Failed to open '{}': {e}", path.display()))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| anyhow!("Failed to decode '{}': {e}", path.display()))?,
            SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()
                    .map_err(|e| anyhow!("Failed to decode '{}': {e}", path.display()))?
            }
        };

        let samples = interleaved
            .chunks_exact(channels)
            .map(|group| group.iter().sum::<f32>() / channels as f32)
            .collect::<Vec<_>>();

        tracing::info!(
            "Loaded {}: {} samples at {}Hz ({} channels, {}-bit {:?})",
            path.display(),
            samples.len(),
            spec.sample_rate,
            spec.channels,
            spec.bits_per_sample,
            spec.sample_format
        );

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
        })
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Snapshot whose last sample lies at or before `time_secs`.
    ///
    /// Returns `None` before the first full snapshot and after the end of the
    /// data, mirroring a source that has not started or has stopped.
    pub fn snapshot_at(&self, time_secs: f64, capture_size: usize) -> Option<WaveformFrame> {
        let capture_size = capture_size.max(1);
        let position = (time_secs * self.sample_rate as f64).floor() as usize;
        let index = position / capture_size;
        if index == 0 {
            return None;
        }
        let end = index * capture_size;
        if end > self.samples.len() {
            return None;
        }
        Some(WaveformFrame::from_normalized(&self.samples[end - capture_size..end]))
    }
}

/// Publishes snapshots of a decoded file from a pacing thread.
pub struct FileCapture {
    pcm: Arc<MonoPcm>,
    capture_size: usize,
    publisher: FramePublisher,
    /// Set to end the pacing thread
    shutdown: Arc<AtomicBool>,
    /// Set when the thread should hold its position
    paused: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl FileCapture {
    /// Loads `path` and prepares a paced source writing into `slot`.
    ///
    /// # Errors
    /// - If the file cannot be decoded
    pub fn open(path: &Path, capture_size: usize, slot: LatestFrame) -> Result<Self> {
        let pcm = MonoPcm::load(path)?;
        if pcm.sample_rate == 0 {
            return Err(anyhow!("'{}' reports a sample rate of 0Hz", path.display()));
        }
        Ok(Self::from_pcm(pcm, capture_size, slot))
    }

    pub fn from_pcm(pcm: MonoPcm, capture_size: usize, slot: LatestFrame) -> Self {
        Self {
            pcm: Arc::new(pcm),
            capture_size: capture_size.max(1),
            publisher: FramePublisher::new(slot),
            shutdown: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// True once the pacing thread has played the whole file.
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| w.is_finished())
    }

    fn spawn_worker(&mut self) -> Result<()> {
        let pcm = Arc::clone(&self.pcm);
        let publisher = self.publisher.clone();
        let shutdown = Arc::clone(&self.shutdown);
        let paused = Arc::clone(&self.paused);
        let capture_size = self.capture_size;
        let period = Duration::from_secs_f64(capture_size as f64 / pcm.sample_rate as f64);

        let handle = std::thread::Builder::new()
            .name("file-capture".to_string())
            .spawn(move || {
                let mut next_due = Instant::now();
                let mut chunks = pcm.samples.chunks_exact(capture_size);

                while !shutdown.load(Ordering::Acquire) {
                    if paused.load(Ordering::Acquire) {
                        std::thread::sleep(period);
                        next_due = Instant::now();
                        continue;
                    }

                    let Some(chunk) = chunks.next() else {
                        tracing::info!("End of file reached");
                        publisher.disable();
                        break;
                    };
                    publisher.publish(WaveformFrame::from_normalized(chunk));

                    next_due += period;
                    let now = Instant::now();
                    if next_due > now {
                        std::thread::sleep(next_due - now);
                    } else {
                        next_due = now;
                    }
                }
            })
            .map_err(|e| anyhow!("Failed to spawn file capture thread: {e}"))?;

        self.worker = Some(handle);
        Ok(())
    }
}

impl WaveformSource for FileCapture {
    fn start(&mut self) -> Result<()> {
        self.paused.store(false, Ordering::Release);
        self.publisher.enable();

        if self.is_finished() {
            if let Some(worker) = self.worker.take() {
                let _ = worker.join();
            }
            tracing::info!("Restarting file from the beginning");
        }

        if self.worker.is_none() {
            self.spawn_worker()?;
            tracing::debug!(
                "File capture started: {:.1}s, {} samples per snapshot",
                self.pcm.duration_secs(),
                self.capture_size
            );
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.paused.store(true, Ordering::Release);
        self.publisher.disable();
        tracing::debug!("File capture paused");
    }

    fn is_running(&self) -> bool {
        self.worker.is_some() && !self.is_finished() && !self.paused.load(Ordering::Acquire)
    }

    fn describe(&self) -> String {
        format!("file ({:.1}s)", self.pcm.duration_secs())
    }
}

impl Drop for FileCapture {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.publisher.disable();
    }
}
