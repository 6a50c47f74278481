//! Per-frame loudness analysis and trail decay.

use crate::capture::frame::CENTER;

/// Envelope rise factor per tick.
pub const ATTACK: f32 = 0.25;
/// Envelope fall factor per tick.
pub const RELEASE: f32 = 0.05;
/// Fade alpha used before any frame has been analyzed.
pub const INITIAL_FADE_ALPHA: u8 = 35;

/// Loudness measurements for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameLevels {
    /// Largest absolute deviation from center, `0..=128`
    pub peak: u8,
    /// Root-mean-square deviation from center
    pub rms: f32,
}

impl FrameLevels {
    pub const SILENT: FrameLevels = FrameLevels { peak: 0, rms: 0.0 };

    /// Measures peak and RMS of a biased 8-bit frame.
    pub fn measure(samples: &[u8]) -> Self {
        if samples.is_empty() {
            return Self::SILENT;
        }

        let mut peak = 0u8;
        let mut sum_of_squares = 0u64;
        for &sample in samples {
            let v = sample as i32 - CENTER as i32;
            peak = peak.max(v.unsigned_abs() as u8);
            sum_of_squares += (v * v) as u64;
        }

        let rms = (sum_of_squares as f64 / samples.len() as f64).sqrt() as f32;
        Self { peak, rms }
    }
}

/// Trail fade strength for a frame's peak amplitude.
///
/// Louder material erases the previous trail faster.
pub fn fade_alpha(peak: u8) -> u8 {
    match peak {
        0..=9 => 18,
        10..=29 => 28,
        30..=59 => 40,
        _ => 55,
    }
}

/// Result of analyzing one tick's frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Analysis {
    pub levels: FrameLevels,
    /// Envelope after this tick's update
    pub envelope: f32,
    pub fade_alpha: u8,
}

/// Attack/release volume follower plus trail decay selection.
#[derive(Debug, Clone)]
pub struct EnvelopeAnalyzer {
    envelope: f32,
    fade_alpha: u8,
}

impl EnvelopeAnalyzer {
    pub fn new() -> Self {
        Self {
            envelope: 0.0,
            fade_alpha: INITIAL_FADE_ALPHA,
        }
    }

    /// Measures `samples` and advances the envelope by one tick.
    pub fn analyze(&mut self, samples: &[u8]) -> Analysis {
        let levels = FrameLevels::measure(samples);

        let rate = if levels.rms > self.envelope {
            ATTACK
        } else {
            RELEASE
        };
        self.envelope = (self.envelope + (levels.rms - self.envelope) * rate).max(0.0);
        self.fade_alpha = fade_alpha(levels.peak);

        Analysis {
            levels,
            envelope: self.envelope,
            fade_alpha: self.fade_alpha,
        }
    }

    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    /// Fade alpha from the most recent analysis, used on ticks without data.
    pub fn fade_alpha(&self) -> u8 {
        self.fade_alpha
    }
}

impl Default for EnvelopeAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_silence_measures_zero() {
        let levels = FrameLevels::measure(&[128; 512]);
        assert_eq!(levels.peak, 0);
        assert_eq!(levels.rms, 0.0);
    }

    #[test]
    fn test_empty_frame_measures_zero() {
        assert_eq!(FrameLevels::measure(&[]), FrameLevels::SILENT);
    }

    #[test]
    fn test_square_wave_levels() {
        let samples: Vec<u8> = (0..256).map(|i| if i % 2 == 0 { 0 } else { 255 }).collect();
        let levels = FrameLevels::measure(&samples);

        assert_eq!(levels.peak, 128);
        // -128 and +127 alternate.
        assert_abs_diff_eq!(levels.rms, 127.5, epsilon = 0.01);
    }

    #[test]
    fn test_fade_alpha_bucket_boundaries() {
        assert_eq!(fade_alpha(0), 18);
        assert_eq!(fade_alpha(9), 18);
        assert_eq!(fade_alpha(10), 28);
        assert_eq!(fade_alpha(29), 28);
        assert_eq!(fade_alpha(30), 40);
        assert_eq!(fade_alpha(59), 40);
        assert_eq!(fade_alpha(60), 55);
        assert_eq!(fade_alpha(128), 55);
    }

    #[test]
    fn test_envelope_attack_step() {
        let mut analyzer = EnvelopeAnalyzer::new();
        // Constant offset of 100 gives rms 100.
        let analysis = analyzer.analyze(&[228; 64]);

        assert_abs_diff_eq!(analysis.levels.rms, 100.0, epsilon = 1e-4);
        assert_abs_diff_eq!(analysis.envelope, 25.0, epsilon = 1e-4);
        assert!(analysis.envelope <= analysis.levels.rms);
    }

    #[test]
    fn test_envelope_release_is_slow_and_strictly_decreasing() {
        let mut analyzer = EnvelopeAnalyzer::new();
        for _ in 0..40 {
            analyzer.analyze(&[228; 64]);
        }
        let loud = analyzer.envelope();
        assert!(loud > 99.0 && loud <= 100.0);

        let mut previous = loud;
        for _ in 0..10 {
            let envelope = analyzer.analyze(&[148; 64]).envelope;
            assert!(envelope < previous);
            assert!(envelope > 20.0);
            // Release step, never the attack step.
            assert_abs_diff_eq!(envelope, previous + (20.0 - previous) * RELEASE, epsilon = 1e-3);
            previous = envelope;
        }
    }

    #[test]
    fn test_envelope_never_overshoots_input() {
        let mut analyzer = EnvelopeAnalyzer::new();
        let inputs = [10u8, 200, 128, 255, 0, 140, 250, 128];
        for &value in &inputs {
            let before = analyzer.envelope();
            let analysis = analyzer.analyze(&[value; 32]);
            let rms = analysis.levels.rms;
            let low = before.min(rms);
            let high = before.max(rms);
            assert!(analysis.envelope >= low - 1e-4 && analysis.envelope <= high + 1e-4);
            assert!(analysis.envelope >= 0.0);
        }
    }

    #[test]
    fn test_fade_alpha_retained_between_frames() {
        let mut analyzer = EnvelopeAnalyzer::new();
        assert_eq!(analyzer.fade_alpha(), INITIAL_FADE_ALPHA);

        analyzer.analyze(&[255; 8]);
        assert_eq!(analyzer.fade_alpha(), 55);
    }
}
