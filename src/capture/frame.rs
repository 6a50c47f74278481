//! Waveform snapshots and the assembler that produces them from PCM input.

/// Sample value that represents zero amplitude.
pub const CENTER: u8 = 128;

/// One immutable snapshot of time-domain samples.
///
/// Samples are unsigned 8-bit, DC-biased at 128, so `0..=255` maps to the
/// signed range `-128..=127`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveformFrame {
    samples: Vec<u8>,
}

impl WaveformFrame {
    pub fn new(samples: Vec<u8>) -> Self {
        Self { samples }
    }

    /// Quantizes normalized `[-1.0, 1.0]` samples into a frame.
    pub fn from_normalized(samples: &[f32]) -> Self {
        Self::new(samples.iter().map(|&s| quantize(s)).collect())
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }
}

/// Maps a normalized sample onto the biased 8-bit scale.
pub fn quantize(sample: f32) -> u8 {
    if !sample.is_finite() {
        return CENTER;
    }
    (sample * 128.0 + 128.0).round().clamp(0.0, 255.0) as u8
}

/// Collects interleaved PCM into fixed-size mono snapshots.
///
/// Runs on the capture thread. The internal buffer is allocated once and
/// reused; a finished snapshot is copied out into a new frame.
pub struct FrameAssembler {
    buffer: Vec<f32>,
    capture_size: usize,
    channels: usize,
}

impl FrameAssembler {
    /// Creates an assembler producing `capture_size` samples per frame from
    /// input with `channels` interleaved channels.
    pub fn new(capture_size: usize, channels: usize) -> Self {
        let capture_size = capture_size.max(1);
        Self {
            buffer: Vec::with_capacity(capture_size),
            capture_size,
            channels: channels.max(1),
        }
    }

    /// Feeds interleaved normalized samples, calling `emit` for every
    /// completed snapshot. A trailing partial channel group is ignored.
    pub fn push_interleaved<F>(&mut self, data: &[f32], mut emit: F)
    where
        F: FnMut(WaveformFrame),
    {
        for group in data.chunks_exact(self.channels) {
            let mono = group.iter().sum::<f32>() / self.channels as f32;
            self.buffer.push(mono);

            if self.buffer.len() == self.capture_size {
                emit(WaveformFrame::from_normalized(&self.buffer));
                self.buffer.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_range() {
        assert_eq!(quantize(0.0), 128);
        assert_eq!(quantize(-1.0), 0);
        assert_eq!(quantize(1.0), 255);
        assert_eq!(quantize(2.5), 255);
        assert_eq!(quantize(-7.0), 0);
        assert_eq!(quantize(f32::NAN), 128);
    }

    #[test]
    fn test_assembler_emits_full_frames_only() {
        let mut assembler = FrameAssembler::new(4, 1);
        let mut frames = Vec::new();

        assembler.push_interleaved(&[0.0, 0.5, -0.5, 0.0, 1.0, 1.0], |f| frames.push(f));

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].samples(), &[128, 192, 64, 128]);

        assembler.push_interleaved(&[1.0, 1.0], |f| frames.push(f));
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].samples(), &[255, 255, 255, 255]);
    }

    #[test]
    fn test_assembler_mixes_stereo_to_mono() {
        let mut assembler = FrameAssembler::new(2, 2);
        let mut frames = Vec::new();

        assembler.push_interleaved(&[1.0, -1.0, 0.5, 0.5], |f| frames.push(f));

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].samples(), &[128, 192]);
    }

    #[test]
    fn test_assembler_ignores_partial_channel_group() {
        let mut assembler = FrameAssembler::new(2, 2);
        let mut frames = Vec::new();

        assembler.push_interleaved(&[0.5, 0.5, 0.5], |f| frames.push(f));
        assert!(frames.is_empty());

        assembler.push_interleaved(&[0.0, 0.0], |f| frames.push(f));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].samples(), &[192, 128]);
    }
}
