//! Audio-reactive scope renderer.
//!
//! [`Scope::on_tick`] is the single per-frame entry point: the host calls it
//! once per display refresh with the newest waveform snapshot (if any), the
//! current canvas size and the visualizer settings. Everything happens
//! synchronously inside that call; the scope has no loop or timer of its own.

pub mod analyzer;
pub mod compositor;
pub mod curve;
pub mod gain;

pub use analyzer::{Analysis, EnvelopeAnalyzer};
pub use compositor::Compositor;
pub use curve::{CurveKind, CurveParams};
pub use gain::{AutoGain, GainBand};

use crate::capture::WaveformFrame;
use serde::{Deserialize, Serialize};
use tiny_skia::Pixmap;

/// Which curve algorithm draws the frame.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum RenderMode {
    /// Amplitude over time, left to right
    TimeDomain,
    /// Frame plotted against a phase-shifted copy of itself
    #[default]
    Attractor,
}

impl RenderMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::TimeDomain => Self::Attractor,
            Self::Attractor => Self::TimeDomain,
        }
    }
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimeDomain => write!(f, "time-domain"),
            Self::Attractor => write!(f, "attractor"),
        }
    }
}

/// Pixel dimensions of the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Visualizer settings read on every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScopeSettings {
    pub mode: RenderMode,
    /// Cubic handle length as a fraction of sample spacing, `0.0..=1.0`
    pub tension: f32,
    pub min_gain: f32,
    pub max_gain: f32,
    /// Blend the first difference into attractor channels
    pub shimmer: bool,
}

impl ScopeSettings {
    pub fn gain_band(&self) -> GainBand {
        GainBand::new(self.min_gain, self.max_gain)
    }
}

impl Default for ScopeSettings {
    fn default() -> Self {
        Self {
            mode: RenderMode::default(),
            tension: 0.5,
            min_gain: 0.5,
            max_gain: 6.0,
            shimmer: true,
        }
    }
}

/// The drawing surface could not be prepared for this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    #[error("canvas has zero width or height")]
    EmptyCanvas,
    #[error("failed to allocate a {width}x{height} surface")]
    Allocation { width: u32, height: u32 },
}

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Present when a frame was available
    pub analysis: Option<Analysis>,
    /// Kind and segment count of the drawn path
    pub curve: Option<(CurveKind, usize)>,
    pub fade_alpha: u8,
    pub gain: f32,
}

/// Analyzer, gain follower and compositor wired together.
///
/// All state is owned here and only touched from the render loop.
pub struct Scope {
    analyzer: EnvelopeAnalyzer,
    gain: AutoGain,
    compositor: Compositor,
}

impl Scope {
    pub fn new(settings: &ScopeSettings) -> Self {
        Self {
            analyzer: EnvelopeAnalyzer::new(),
            gain: AutoGain::new(settings.gain_band()),
            compositor: Compositor::new(),
        }
    }

    /// Runs one render tick.
    ///
    /// Without a frame the trail still fades (at the last used strength) but
    /// nothing new is drawn.
    ///
    /// # Errors
    /// - If the surface cannot be allocated at `size`. Scope state is left
    ///   untouched so the caller can simply try again next tick.
    pub fn on_tick(
        &mut self,
        frame: Option<&WaveformFrame>,
        size: CanvasSize,
        settings: &ScopeSettings,
    ) -> Result<TickReport, SurfaceError> {
        self.compositor.ensure_surface(size)?;

        let Some(frame) = frame else {
            let fade_alpha = self.analyzer.fade_alpha();
            self.compositor.fade(fade_alpha);
            return Ok(TickReport {
                analysis: None,
                curve: None,
                fade_alpha,
                gain: self.gain.gain(),
            });
        };

        let analysis = self.analyzer.analyze(frame.samples());
        let gain = self.gain.update(analysis.levels.rms, settings.gain_band());

        let curve = curve::generate(
            frame.samples(),
            &CurveParams {
                mode: settings.mode,
                size,
                tension: settings.tension,
                gain,
                envelope: analysis.envelope,
                peak: analysis.levels.peak,
                shimmer: settings.shimmer,
            },
        );

        self.compositor.fade(analysis.fade_alpha);
        self.compositor.draw(&curve.path);

        tracing::trace!(
            peak = analysis.levels.peak,
            rms = analysis.levels.rms,
            envelope = analysis.envelope,
            gain,
            kind = ?curve.kind,
            "scope tick"
        );

        Ok(TickReport {
            analysis: Some(analysis),
            curve: Some((curve.kind, curve.path.segments().len())),
            fade_alpha: analysis.fade_alpha,
            gain,
        })
    }

    /// The image composited by the most recent successful tick.
    pub fn present(&self) -> Option<&Pixmap> {
        self.compositor.present()
    }

    pub fn envelope(&self) -> f32 {
        self.analyzer.envelope()
    }

    pub fn gain(&self) -> f32 {
        self.gain.gain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn square_wave() -> WaveformFrame {
        WaveformFrame::new((0..256).map(|i| if i % 2 == 0 { 0 } else { 255 }).collect())
    }

    fn max_alpha(scope: &Scope) -> u8 {
        scope
            .present()
            .unwrap()
            .pixels()
            .iter()
            .map(|p| p.alpha())
            .max()
            .unwrap_or(0)
    }

    fn alpha_at(scope: &Scope, x: u32, y: u32) -> u8 {
        scope.present().unwrap().pixel(x, y).unwrap().alpha()
    }

    #[test]
    fn test_square_wave_time_domain_end_to_end() {
        let settings = ScopeSettings {
            mode: RenderMode::TimeDomain,
            tension: 0.5,
            ..ScopeSettings::default()
        };
        let mut scope = Scope::new(&settings);
        let size = CanvasSize::new(320, 200);

        let report = scope.on_tick(Some(&square_wave()), size, &settings).unwrap();
        let analysis = report.analysis.unwrap();

        assert_eq!(analysis.levels.peak, 128);
        assert_abs_diff_eq!(analysis.levels.rms, 127.5, epsilon = 0.01);
        assert_eq!(report.fade_alpha, 55);
        assert_eq!(report.curve, Some((CurveKind::Waveform, 255)));
        assert!(report.gain >= settings.min_gain && report.gain <= settings.max_gain);

        // The trace stays inside the canvas: top and bottom rows untouched.
        let surface = scope.present().unwrap();
        for x in 0..surface.width() {
            assert_eq!(alpha_at(&scope, x, 0), 0);
            assert_eq!(alpha_at(&scope, x, surface.height() - 1), 0);
        }
        assert!(max_alpha(&scope) > 0);
    }

    #[test]
    fn test_silence_draws_degenerate_paths() {
        let silence = WaveformFrame::new(vec![128; 256]);
        let size = CanvasSize::new(100, 60);

        for (mode, kind) in [
            (RenderMode::TimeDomain, CurveKind::FlatLine),
            (RenderMode::Attractor, CurveKind::IdleCircle),
        ] {
            let settings = ScopeSettings {
                mode,
                ..ScopeSettings::default()
            };
            let mut scope = Scope::new(&settings);
            let report = scope.on_tick(Some(&silence), size, &settings).unwrap();

            let analysis = report.analysis.unwrap();
            assert_eq!(analysis.levels.peak, 0);
            assert_eq!(analysis.levels.rms, 0.0);
            assert_eq!(report.curve.map(|(k, _)| k), Some(kind));
        }
    }

    #[test]
    fn test_idle_circle_visible_for_quiet_frame() {
        let settings = ScopeSettings::default();
        let mut scope = Scope::new(&settings);
        let quiet = WaveformFrame::new(vec![129; 512]);

        scope.on_tick(Some(&quiet), CanvasSize::new(100, 100), &settings).unwrap();

        // The ring passes through (60, 50); its middle stays dark-ish.
        assert!(alpha_at(&scope, 60, 50) > 0);
        assert!(alpha_at(&scope, 50, 50) < alpha_at(&scope, 60, 50));
    }

    #[test]
    fn test_absent_frames_fade_to_blank() {
        let settings = ScopeSettings::default();
        let mut scope = Scope::new(&settings);
        let size = CanvasSize::new(160, 120);
        let loud = WaveformFrame::new(
            (0..1024)
                .map(|i| (128.0 + 120.0 * (i as f32 / 64.0 * std::f32::consts::TAU).sin()) as u8)
                .collect(),
        );

        scope.on_tick(Some(&loud), size, &settings).unwrap();
        let lit = max_alpha(&scope);
        assert!(lit > 200);

        let mut previous_total = u64::MAX;
        for _ in 0..50 {
            let report = scope.on_tick(None, size, &settings).unwrap();
            assert!(report.analysis.is_none());
            assert!(report.curve.is_none());

            let total: u64 = scope
                .present()
                .unwrap()
                .pixels()
                .iter()
                .map(|p| p.alpha() as u64)
                .sum();
            assert!(total <= previous_total);
            previous_total = total;
        }

        assert_eq!(max_alpha(&scope), 0, "trail should have decayed to blank");
    }

    #[test]
    fn test_absent_frame_before_any_data_uses_initial_fade() {
        let settings = ScopeSettings::default();
        let mut scope = Scope::new(&settings);
        let report = scope.on_tick(None, CanvasSize::new(8, 8), &settings).unwrap();
        assert_eq!(report.fade_alpha, analyzer::INITIAL_FADE_ALPHA);
        assert_eq!(max_alpha(&scope), 0);
    }

    #[test]
    fn test_resize_between_ticks() {
        let settings = ScopeSettings::default();
        let mut scope = Scope::new(&settings);
        let frame = square_wave();

        scope.on_tick(Some(&frame), CanvasSize::new(300, 200), &settings).unwrap();
        scope.on_tick(Some(&frame), CanvasSize::new(40, 30), &settings).unwrap();
        let surface = scope.present().unwrap();
        assert_eq!((surface.width(), surface.height()), (40, 30));

        scope.on_tick(Some(&frame), CanvasSize::new(640, 480), &settings).unwrap();
        let surface = scope.present().unwrap();
        assert_eq!((surface.width(), surface.height()), (640, 480));
    }

    #[test]
    fn test_surface_error_leaves_state_untouched() {
        let settings = ScopeSettings::default();
        let mut scope = Scope::new(&settings);
        let frame = square_wave();
        scope.on_tick(Some(&frame), CanvasSize::new(50, 50), &settings).unwrap();
        let envelope = scope.envelope();

        let err = scope.on_tick(Some(&frame), CanvasSize::new(0, 50), &settings);
        assert_eq!(err, Err(SurfaceError::EmptyCanvas));
        assert_eq!(scope.envelope(), envelope);
        assert_eq!(scope.present().unwrap().width(), 50);
    }

    #[test]
    fn test_gain_stays_in_band_across_ticks() {
        let settings = ScopeSettings {
            mode: RenderMode::TimeDomain,
            min_gain: 1.5,
            max_gain: 2.5,
            ..ScopeSettings::default()
        };
        let mut scope = Scope::new(&settings);
        let size = CanvasSize::new(64, 64);

        for level in [0u8, 255, 130, 200, 128, 60, 255, 0] {
            let frame = WaveformFrame::new(vec![level; 128]);
            let report = scope.on_tick(Some(&frame), size, &settings).unwrap();
            assert!(report.gain >= 1.5 && report.gain <= 2.5);
        }
    }

    #[test]
    fn test_render_mode_toggle_and_display() {
        assert_eq!(RenderMode::Attractor.toggled(), RenderMode::TimeDomain);
        assert_eq!(RenderMode::TimeDomain.toggled(), RenderMode::Attractor);
        assert_eq!(RenderMode::TimeDomain.to_string(), "time-domain");
    }
}
