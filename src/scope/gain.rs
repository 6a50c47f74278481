//! Auto-gain: keeps the time-domain trace at a steady visual amplitude.

/// RMS that maps to unity gain.
pub const REFERENCE_RMS: f32 = 64.0;
/// Bounds of the normalized loudness control value.
pub const NORMALIZED_MIN: f32 = 0.08;
pub const NORMALIZED_MAX: f32 = 1.2;
/// Fraction of the remaining distance covered per tick.
pub const SMOOTHING: f32 = 0.12;

/// Gain band from the visualizer settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainBand {
    pub min: f32,
    pub max: f32,
}

impl GainBand {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min >= 0.0 && self.min <= self.max
    }
}

/// Leaky-integrator gain follower.
#[derive(Debug, Clone)]
pub struct AutoGain {
    gain: f32,
    /// Last invalid band reported, so the warning fires once per band
    warned_band: Option<GainBand>,
}

impl AutoGain {
    /// Starts at unity, pulled into `band` when it is valid.
    pub fn new(band: GainBand) -> Self {
        let gain = if band.is_valid() {
            1.0f32.clamp(band.min, band.max)
        } else {
            1.0
        };
        Self {
            gain,
            warned_band: None,
        }
    }

    /// Target gain for a frame's RMS before smoothing.
    ///
    /// An invalid band yields identity gain instead of a clamp with crossed
    /// bounds.
    pub fn target(rms: f32, band: GainBand) -> f32 {
        if !band.is_valid() {
            return 1.0;
        }
        let normalized = (rms / REFERENCE_RMS).clamp(NORMALIZED_MIN, NORMALIZED_MAX);
        (1.0 / normalized).clamp(band.min, band.max)
    }

    /// Advances the smoothed gain one tick toward the target for `rms`.
    pub fn update(&mut self, rms: f32, band: GainBand) -> f32 {
        let rms = if rms.is_finite() { rms.max(0.0) } else { 0.0 };
        let target = Self::target(rms, band);
        self.gain += (target - self.gain) * SMOOTHING;

        if band.is_valid() {
            self.warned_band = None;
            // Only bites when the band moved since the last tick.
            self.gain = self.gain.clamp(band.min, band.max);
        } else if self.warned_band != Some(band) {
            tracing::warn!(
                "Invalid gain band [{}, {}], falling back to identity gain",
                band.min,
                band.max
            );
            self.warned_band = Some(band);
        }

        self.gain
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }
}
