//! Path generation for the two scope modes.
//!
//! Time-domain mode draws the frame left to right as a chain of cubic
//! segments, soft-limited with `tanh` so any gain stays inside the canvas.
//! Attractor mode plots the frame against a phase-shifted copy of itself,
//! producing a closed Lissajous-style loop whose size follows the loudness
//! envelope.

use super::{CanvasSize, RenderMode};
use crate::capture::frame::CENTER;

/// Frames at or below this peak count as silence.
pub const SILENCE_PEAK: u8 = 2;
/// Attractor mode needs more samples than this to draw a loop.
pub const MIN_ATTRACTOR_SAMPLES: usize = 8;
/// Fraction of the canvas height used at unity gain.
pub const TIME_DOMAIN_SCALE: f32 = 0.45;
/// Gap between the limiter ceiling and the canvas edge, in pixels.
pub const LIMITER_MARGIN: f32 = 10.0;
/// Phase offset of the attractor's y channel, as a fraction of the frame.
pub const PHASE_SHIFT: f32 = 0.37;
/// Weight of the first difference when shimmer is on.
pub const SHIMMER_MIX: f32 = 0.15;
/// Fraction of the canvas each attractor axis spans at unit explosion.
pub const ATTRACTOR_SCALE: f32 = 0.42;
/// Envelope that maps to unit explosion scale.
pub const EXPLOSION_REFERENCE: f32 = 50.0;
pub const EXPLOSION_MIN: f32 = 0.3;
pub const EXPLOSION_MAX: f32 = 4.5;
/// Radius of the idle circle shown for silent input.
pub const IDLE_RADIUS: f32 = 10.0;

/// Bezier handle length for a quarter circle.
const KAPPA: f32 = 0.552_284_8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[cfg(test)]
    pub fn distance(&self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Line(Point),
    Cubic { ctrl1: Point, ctrl2: Point, to: Point },
}

impl Segment {
    pub fn end(&self) -> Point {
        match *self {
            Segment::Line(to) | Segment::Cubic { to, .. } => to,
        }
    }
}

/// A path built fresh each tick: a start point followed by segments.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopePath {
    start: Point,
    segments: Vec<Segment>,
    closed: bool,
}

impl ScopePath {
    fn open(start: Point, segments: Vec<Segment>) -> Self {
        Self {
            start,
            segments,
            closed: false,
        }
    }

    /// Builds a closed path, appending a segment back to `start` if needed.
    fn closed(start: Point, mut segments: Vec<Segment>) -> Self {
        if segments.last().map(Segment::end) != Some(start) {
            segments.push(Segment::Line(start));
        }
        Self {
            start,
            segments,
            closed: true,
        }
    }

    pub fn start(&self) -> Point {
        self.start
    }

    #[cfg(test)]
    pub fn end(&self) -> Point {
        self.segments.last().map(Segment::end).unwrap_or(self.start)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Start point followed by every segment end point.
    #[cfg(test)]
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        std::iter::once(self.start).chain(self.segments.iter().map(Segment::end))
    }
}

/// What the generator decided to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveKind {
    Waveform,
    FlatLine,
    Attractor,
    IdleCircle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub kind: CurveKind,
    pub path: ScopePath,
}

/// Per-tick inputs that are not part of the frame itself.
#[derive(Debug, Clone, Copy)]
pub struct CurveParams {
    pub mode: RenderMode,
    pub size: CanvasSize,
    pub tension: f32,
    pub gain: f32,
    pub envelope: f32,
    pub peak: u8,
    pub shimmer: bool,
}

/// Maps a biased 8-bit sample to `[-1.0, 1.0)`.
pub fn normalize(sample: u8) -> f32 {
    (sample as f32 - CENTER as f32) / 128.0
}

/// Loop size multiplier for the attractor.
pub fn explosion_scale(envelope: f32) -> f32 {
    (envelope / EXPLOSION_REFERENCE).clamp(EXPLOSION_MIN, EXPLOSION_MAX)
}

/// Builds this tick's path.
pub fn generate(samples: &[u8], params: &CurveParams) -> Curve {
    match params.mode {
        RenderMode::TimeDomain => time_domain(samples, params),
        RenderMode::Attractor => attractor(samples, params),
    }
}

fn time_domain(samples: &[u8], params: &CurveParams) -> Curve {
    let width = params.size.width as f32;
    let height = params.size.height as f32;
    let center_y = height / 2.0;

    if params.peak <= SILENCE_PEAK || samples.len() < 2 {
        return Curve {
            kind: CurveKind::FlatLine,
            path: ScopePath::open(
                Point::new(0.0, center_y),
                vec![Segment::Line(Point::new(width, center_y))],
            ),
        };
    }

    let base_scale = height * TIME_DOMAIN_SCALE * params.gain;
    let limit = (height / 2.0 - LIMITER_MARGIN).max(1.0);
    let step = width / (samples.len() - 1) as f32;
    let handle = step * params.tension.clamp(0.0, 1.0);

    let point_at = |index: usize, sample: u8| {
        let raw = normalize(sample) * base_scale;
        Point::new(index as f32 * step, center_y - limit * (raw / limit).tanh())
    };

    let start = point_at(0, samples[0]);
    let mut previous = start;
    let segments = samples
        .iter()
        .enumerate()
        .skip(1)
        .map(|(index, &sample)| {
            let to = point_at(index, sample);
            let segment = Segment::Cubic {
                ctrl1: Point::new(previous.x + handle, previous.y),
                ctrl2: Point::new(to.x - handle, to.y),
                to,
            };
            previous = to;
            segment
        })
        .collect();

    Curve {
        kind: CurveKind::Waveform,
        path: ScopePath::open(start, segments),
    }
}

fn attractor(samples: &[u8], params: &CurveParams) -> Curve {
    let width = params.size.width as f32;
    let height = params.size.height as f32;
    let center = Point::new(width / 2.0, height / 2.0);

    if params.peak <= SILENCE_PEAK || samples.len() <= MIN_ATTRACTOR_SAMPLES {
        return Curve {
            kind: CurveKind::IdleCircle,
            path: circle(center, IDLE_RADIUS),
        };
    }

    let count = samples.len();
    let shift = (count as f32 * PHASE_SHIFT) as usize;
    let explosion = explosion_scale(params.envelope);
    let x_scale = width * ATTRACTOR_SCALE * explosion;
    let y_scale = height * ATTRACTOR_SCALE * explosion;

    let mut last_a = 0.0;
    let mut last_b = 0.0;
    let mut points = (0..count).map(|i| {
        let raw_a = normalize(samples[i]);
        let raw_b = normalize(samples[(i + shift) % count]);

        let (a, b) = if params.shimmer {
            (
                (1.0 - SHIMMER_MIX) * raw_a + SHIMMER_MIX * (raw_a - last_a),
                (1.0 - SHIMMER_MIX) * raw_b + SHIMMER_MIX * (raw_b - last_b),
            )
        } else {
            (raw_a, raw_b)
        };
        last_a = raw_a;
        last_b = raw_b;

        Point::new(center.x + a * x_scale, center.y + b * y_scale)
    });

    // count > MIN_ATTRACTOR_SAMPLES, so there is a first point.
    let start = points.next().unwrap_or(center);
    let segments = points.map(Segment::Line).collect();

    Curve {
        kind: CurveKind::Attractor,
        path: ScopePath::closed(start, segments),
    }
}

/// Circle approximated by four cubic arcs, starting and ending at 3 o'clock.
fn circle(center: Point, radius: f32) -> ScopePath {
    let k = radius * KAPPA;
    let (cx, cy, r) = (center.x, center.y, radius);

    let start = Point::new(cx + r, cy);
    let segments = vec![
        Segment::Cubic {
            ctrl1: Point::new(cx + r, cy + k),
            ctrl2: Point::new(cx + k, cy + r),
            to: Point::new(cx, cy + r),
        },
        Segment::Cubic {
            ctrl1: Point::new(cx - k, cy + r),
            ctrl2: Point::new(cx - r, cy + k),
            to: Point::new(cx - r, cy),
        },
        Segment::Cubic {
            ctrl1: Point::new(cx - r, cy - k),
            ctrl2: Point::new(cx - k, cy - r),
            to: Point::new(cx, cy - r),
        },
        Segment::Cubic {
            ctrl1: Point::new(cx + k, cy - r),
            ctrl2: Point::new(cx + r, cy - k),
            to: start,
        },
    ];
    ScopePath::closed(start, segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::analyzer::FrameLevels;
    use approx::assert_abs_diff_eq;

    fn params(mode: RenderMode, samples: &[u8]) -> CurveParams {
        CurveParams {
            mode,
            size: CanvasSize::new(400, 300),
            tension: 0.5,
            gain: 1.0,
            envelope: 50.0,
            peak: FrameLevels::measure(samples).peak,
            shimmer: true,
        }
    }

    fn square_wave() -> Vec<u8> {
        (0..256).map(|i| if i % 2 == 0 { 0 } else { 255 }).collect()
    }

    fn sine(len: usize, period: usize, amplitude: f32) -> Vec<u8> {
        (0..len)
            .map(|i| {
                let phase = i as f32 / period as f32 * std::f32::consts::TAU;
                (128.0 + amplitude * phase.sin()).round() as u8
            })
            .collect()
    }

    #[test]
    fn test_silence_is_flat_line_in_time_domain() {
        let samples = [128u8; 256];
        let curve = generate(&samples, &params(RenderMode::TimeDomain, &samples));

        assert_eq!(curve.kind, CurveKind::FlatLine);
        assert!(!curve.path.is_closed());
        assert_eq!(curve.path.start(), Point::new(0.0, 150.0));
        assert_eq!(curve.path.end(), Point::new(400.0, 150.0));
    }

    #[test]
    fn test_silence_is_idle_circle_in_attractor() {
        let samples = [128u8; 256];
        let curve = generate(&samples, &params(RenderMode::Attractor, &samples));

        assert_eq!(curve.kind, CurveKind::IdleCircle);
        assert!(curve.path.is_closed());
        for point in curve.path.points() {
            assert_abs_diff_eq!(point.distance(Point::new(200.0, 150.0)), IDLE_RADIUS, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_empty_frame_is_degenerate_in_both_modes() {
        let empty: [u8; 0] = [];
        let p = params(RenderMode::TimeDomain, &empty);
        assert_eq!(generate(&empty, &p).kind, CurveKind::FlatLine);

        let p = params(RenderMode::Attractor, &empty);
        assert_eq!(generate(&empty, &p).kind, CurveKind::IdleCircle);
    }

    #[test]
    fn test_short_loud_frame_is_idle_in_attractor() {
        let samples = [0u8, 255, 0, 255, 0, 255, 0, 255];
        let curve = generate(&samples, &params(RenderMode::Attractor, &samples));
        assert_eq!(curve.kind, CurveKind::IdleCircle);
    }

    #[test]
    fn test_square_wave_time_domain_segments_bounded() {
        let samples = square_wave();
        let mut p = params(RenderMode::TimeDomain, &samples);
        p.gain = 12.0;
        let curve = generate(&samples, &p);

        assert_eq!(curve.kind, CurveKind::Waveform);
        assert_eq!(curve.path.segments().len(), 255);
        assert!(!curve.path.is_closed());
        assert_abs_diff_eq!(curve.path.start().x, 0.0);
        assert_abs_diff_eq!(curve.path.end().x, 400.0, epsilon = 1e-3);

        let limit = 150.0 - LIMITER_MARGIN;
        for segment in curve.path.segments() {
            let Segment::Cubic { ctrl1, ctrl2, to } = *segment else {
                panic!("time-domain segments are cubic");
            };
            for point in [ctrl1, ctrl2, to] {
                assert!(point.y >= 150.0 - limit - 1e-3 && point.y <= 150.0 + limit + 1e-3);
            }
        }
    }

    #[test]
    fn test_tension_sets_handle_length() {
        let samples = square_wave();
        let step = 400.0 / 255.0;

        for tension in [0.0f32, 0.5, 1.0] {
            let mut p = params(RenderMode::TimeDomain, &samples);
            p.tension = tension;
            let curve = generate(&samples, &p);
            let Segment::Cubic { ctrl1, ctrl2, to } = curve.path.segments()[0] else {
                panic!("expected cubic");
            };
            assert_abs_diff_eq!(ctrl1.x - curve.path.start().x, step * tension, epsilon = 1e-4);
            assert_abs_diff_eq!(to.x - ctrl2.x, step * tension, epsilon = 1e-4);
            assert_abs_diff_eq!(ctrl1.y, curve.path.start().y);
            assert_abs_diff_eq!(ctrl2.y, to.y);
        }
    }

    #[test]
    fn test_limiter_is_soft() {
        let samples = sine(256, 64, 20.0);
        let quiet = generate(&samples, &params(RenderMode::TimeDomain, &samples));
        let mut loud_params = params(RenderMode::TimeDomain, &samples);
        loud_params.gain = 8.0;
        let loud = generate(&samples, &loud_params);

        let spread = |curve: &Curve| {
            curve
                .path
                .points()
                .map(|p| (p.y - 150.0).abs())
                .fold(0.0f32, f32::max)
        };
        assert!(spread(&loud) > spread(&quiet));
        assert!(spread(&loud) < 150.0 - LIMITER_MARGIN);
    }

    #[test]
    fn test_attractor_closes_on_periodic_input() {
        let samples = sine(1024, 64, 100.0);
        let curve = generate(&samples, &params(RenderMode::Attractor, &samples));

        assert_eq!(curve.kind, CurveKind::Attractor);
        assert!(curve.path.is_closed());
        let start = curve.path.start();
        let end = curve.path.end();
        assert_abs_diff_eq!(start.x, end.x, epsilon = 1e-4);
        assert_abs_diff_eq!(start.y, end.y, epsilon = 1e-4);
        assert_eq!(curve.path.segments().len(), 1024);
    }

    #[test]
    fn test_attractor_loop_is_not_degenerate() {
        let samples = sine(1024, 64, 100.0);
        let mut p = params(RenderMode::Attractor, &samples);
        p.shimmer = false;
        let curve = generate(&samples, &p);

        let xs: Vec<f32> = curve.path.points().map(|p| p.x).collect();
        let ys: Vec<f32> = curve.path.points().map(|p| p.y).collect();
        let range = |v: &[f32]| {
            v.iter().cloned().fold(f32::MIN, f32::max) - v.iter().cloned().fold(f32::MAX, f32::min)
        };
        assert!(range(&xs) > 100.0);
        assert!(range(&ys) > 100.0);
    }

    #[test]
    fn test_attractor_uses_phase_shift() {
        let samples = sine(100, 100, 100.0);
        let mut p = params(RenderMode::Attractor, &samples);
        p.shimmer = false;
        p.envelope = 50.0;
        let curve = generate(&samples, &p);

        let shift = 37;
        let expected_y = 150.0 + normalize(samples[shift]) * 300.0 * ATTRACTOR_SCALE;
        let expected_x = 200.0 + normalize(samples[0]) * 400.0 * ATTRACTOR_SCALE;
        assert_abs_diff_eq!(curve.path.start().x, expected_x, epsilon = 1e-3);
        assert_abs_diff_eq!(curve.path.start().y, expected_y, epsilon = 1e-3);
    }

    #[test]
    fn test_shimmer_applied_to_both_channels() {
        let samples = sine(100, 100, 100.0);
        let mut plain = params(RenderMode::Attractor, &samples);
        plain.shimmer = false;
        let mut shimmer = plain;
        shimmer.shimmer = true;

        let a = generate(&samples, &plain);
        let b = generate(&samples, &shimmer);
        let p1 = a.path.points().nth(1).unwrap();
        let s1 = b.path.points().nth(1).unwrap();

        let raw_a = normalize(samples[1]);
        let prev_a = normalize(samples[0]);
        let expected_x = 200.0 + (0.85 * raw_a + 0.15 * (raw_a - prev_a)) * 400.0 * ATTRACTOR_SCALE;
        assert_abs_diff_eq!(s1.x, expected_x, epsilon = 1e-3);
        assert!((s1.y - p1.y).abs() > 0.0);
    }

    #[test]
    fn test_explosion_scale_clamped() {
        assert_abs_diff_eq!(explosion_scale(0.0), EXPLOSION_MIN);
        assert_abs_diff_eq!(explosion_scale(50.0), 1.0);
        assert_abs_diff_eq!(explosion_scale(1000.0), EXPLOSION_MAX);
    }

    #[test]
    fn test_louder_envelope_expands_loop() {
        let samples = sine(512, 64, 60.0);
        let mut quiet = params(RenderMode::Attractor, &samples);
        quiet.envelope = 20.0;
        let mut loud = quiet;
        loud.envelope = 120.0;

        let radius = |curve: &Curve| {
            curve
                .path
                .points()
                .map(|p| p.distance(Point::new(200.0, 150.0)))
                .fold(0.0f32, f32::max)
        };
        assert!(radius(&generate(&samples, &loud)) > radius(&generate(&samples, &quiet)));
    }
}
