//! Persistent pixel surface with fading trails.
//!
//! The surface is never cleared between ticks. Each tick erases a fraction of
//! what is already there with a destination-out fill, then strokes the new
//! path on top, so earlier traces linger as a decaying trail.

use super::curve::{ScopePath, Segment};
use super::{CanvasSize, SurfaceError};
use tiny_skia::{
    BlendMode, Color, LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap, PremultipliedColorU8,
    Rect, Stroke, Transform,
};

/// Trace color (pure green).
pub const TRACE_RGB: (u8, u8, u8) = (0x00, 0xFF, 0x00);
pub const TRACE_WIDTH: f32 = 5.0;
/// The glow pass is stroked this much wider than the trace on each side.
pub const GLOW_RADIUS: f32 = 10.0;
pub const GLOW_ALPHA: u8 = 64;

/// Owns the retained surface and the paints used on it.
pub struct Compositor {
    surface: Option<Pixmap>,
    fade_paint: Paint<'static>,
    trace_paint: Paint<'static>,
    glow_paint: Paint<'static>,
    trace_stroke: Stroke,
    glow_stroke: Stroke,
}

impl Compositor {
    pub fn new() -> Self {
        let mut fade_paint = Paint::default();
        fade_paint.blend_mode = BlendMode::DestinationOut;
        fade_paint.anti_alias = false;

        let (r, g, b) = TRACE_RGB;
        let mut trace_paint = Paint::default();
        trace_paint.set_color_rgba8(r, g, b, 255);
        trace_paint.anti_alias = true;

        let mut glow_paint = Paint::default();
        glow_paint.set_color_rgba8(r, g, b, GLOW_ALPHA);
        glow_paint.anti_alias = true;

        let trace_stroke = Stroke {
            width: TRACE_WIDTH,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        let glow_stroke = Stroke {
            width: TRACE_WIDTH + GLOW_RADIUS * 2.0,
            ..trace_stroke.clone()
        };

        Self {
            surface: None,
            fade_paint,
            trace_paint,
            glow_paint,
            trace_stroke,
            glow_stroke,
        }
    }

    /// Makes sure the surface exists at `size`, reallocating on change.
    ///
    /// On failure the previous surface, if any, is kept.
    ///
    /// # Errors
    /// - `SurfaceError::EmptyCanvas` if either dimension is zero
    /// - `SurfaceError::Allocation` if the pixel buffer cannot be created
    pub fn ensure_surface(&mut self, size: CanvasSize) -> Result<(), SurfaceError> {
        if size.is_empty() {
            return Err(SurfaceError::EmptyCanvas);
        }

        let matches = self
            .surface
            .as_ref()
            .is_some_and(|s| s.width() == size.width && s.height() == size.height);
        if matches {
            return Ok(());
        }

        let surface = Pixmap::new(size.width, size.height).ok_or(SurfaceError::Allocation {
            width: size.width,
            height: size.height,
        })?;
        tracing::debug!("Allocated {}x{} scope surface", size.width, size.height);
        self.surface = Some(surface);
        Ok(())
    }

    /// Erases a share of the existing image proportional to `alpha / 255`.
    pub fn fade(&mut self, alpha: u8) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let Some(rect) = Rect::from_xywh(0.0, 0.0, surface.width() as f32, surface.height() as f32)
        else {
            return;
        };

        self.fade_paint.set_color(Color::from_rgba8(0, 0, 0, alpha));
        surface.fill_rect(rect, &self.fade_paint, Transform::identity(), None);

        // 8-bit rounding stalls the erase on faint pixels; drop them outright.
        let floor = residue_floor(alpha);
        for pixel in surface.pixels_mut() {
            if pixel.alpha() <= floor {
                *pixel = PremultipliedColorU8::TRANSPARENT;
            }
        }
    }

    /// Strokes `path` over the existing image. Returns false if nothing was drawn.
    pub fn draw(&mut self, path: &ScopePath) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        let Some(skia_path) = to_skia_path(path) else {
            tracing::trace!("Skipping degenerate path");
            return false;
        };

        let transform = Transform::identity();
        surface.stroke_path(&skia_path, &self.glow_paint, &self.glow_stroke, transform, None);
        surface.stroke_path(&skia_path, &self.trace_paint, &self.trace_stroke, transform, None);
        true
    }

    /// The composited image for this tick.
    pub fn present(&self) -> Option<&Pixmap> {
        self.surface.as_ref()
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

/// Highest pixel alpha a destination-out pass at `alpha` may fail to reduce.
///
/// A pixel at `a` loses about `a * alpha / 255`, which rounds to nothing
/// once `a` is below `255 / alpha`.
fn residue_floor(alpha: u8) -> u8 {
    if alpha == 0 {
        return 0;
    }
    let alpha = u16::from(alpha);
    (255u16.div_ceil(alpha)).min(255) as u8
}

fn to_skia_path(path: &ScopePath) -> Option<Path> {
    let mut builder = PathBuilder::with_capacity(path.segments().len() + 1, path.segments().len() * 3 + 1);
    let start = path.start();
    builder.move_to(start.x, start.y);

    for segment in path.segments() {
        match *segment {
            Segment::Line(to) => builder.line_to(to.x, to.y),
            Segment::Cubic { ctrl1, ctrl2, to } => {
                builder.cubic_to(ctrl1.x, ctrl1.y, ctrl2.x, ctrl2.y, to.x, to.y)
            }
        }
    }
    if path.is_closed() {
        builder.close();
    }
    builder.finish()
}
