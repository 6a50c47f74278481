//! Headless rendering of a WAV file to PNG.
//!
//! Runs the scope against a simulated clock: tick `i` sees the snapshot a
//! real-time source would have published at `i / fps` seconds. After the
//! file ends a short tail of empty ticks lets the trail decay.

use super::session::{load_config_or_report, ScopeOverrides};
use crate::capture::MonoPcm;
use crate::scope::{CanvasSize, Scope, ScopeSettings};
use anyhow::anyhow;
use std::fs;
use std::path::{Path, PathBuf};

/// Output options for a headless render.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub size: CanvasSize,
    pub fps: u32,
    pub capture_size: usize,
    /// Empty ticks rendered after the last sample
    pub tail_ticks: u32,
    /// Write every tick as a numbered PNG here
    pub frames_dir: Option<PathBuf>,
}

/// Counts from a finished render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    pub ticks: u64,
    pub ticks_with_frame: u64,
    pub frames_written: u64,
}

/// Renders `pcm` tick by tick and returns the scope holding the final image.
///
/// # Errors
/// - If the canvas size is unusable
/// - If a frame image cannot be written
pub fn render_pcm(
    pcm: &MonoPcm,
    settings: &ScopeSettings,
    options: &RenderOptions,
) -> anyhow::Result<(Scope, RenderSummary)> {
    if let Some(dir) = &options.frames_dir {
        fs::create_dir_all(dir)
            .map_err(|e| anyhow!("Failed to create {}: {e}", dir.display()))?;
    }

    let fps = f64::from(options.fps.max(1));
    let playing_ticks = (pcm.duration_secs() * fps).ceil() as u64;
    let total_ticks = playing_ticks + u64::from(options.tail_ticks);

    let mut scope = Scope::new(settings);
    let mut summary = RenderSummary {
        ticks: 0,
        ticks_with_frame: 0,
        frames_written: 0,
    };

    for tick in 0..total_ticks {
        let frame = pcm.snapshot_at(tick as f64 / fps, options.capture_size);
        let report = scope.on_tick(frame.as_ref(), options.size, settings)?;

        summary.ticks += 1;
        if report.analysis.is_some() {
            summary.ticks_with_frame += 1;
        }

        if let Some(dir) = &options.frames_dir {
            let path = dir.join(format!("frame_{tick:05}.png"));
            save_png(&scope, &path)?;
            summary.frames_written += 1;
        }
    }

    tracing::info!(
        ticks = summary.ticks,
        with_frame = summary.ticks_with_frame,
        "Render finished"
    );
    Ok((scope, summary))
}

fn save_png(scope: &Scope, path: &Path) -> anyhow::Result<()> {
    let pixmap = scope
        .present()
        .ok_or_else(|| anyhow!("Nothing has been rendered yet"))?;
    pixmap
        .save_png(path)
        .map_err(|e| anyhow!("Failed to write {}: {e}", path.display()))
}

/// Renders `input` and writes the final surface to `output`.
///
/// # Errors
/// - If the configuration is invalid or the file cannot be decoded
/// - If any image cannot be written
pub fn handle_render(
    input: &Path,
    output: &Path,
    size: CanvasSize,
    frames_dir: Option<PathBuf>,
    overrides: ScopeOverrides,
) -> anyhow::Result<()> {
    let config = load_config_or_report()?;
    let settings = overrides.resolve(&config)?;
    let pcm = MonoPcm::load(input)?;

    let options = RenderOptions {
        size,
        fps: config.display.fps,
        capture_size: config.audio.capture_size,
        tail_ticks: config.display.fps / 2,
        frames_dir,
    };

    tracing::info!(
        "Rendering {} at {}x{}, {} fps, mode={}",
        input.display(),
        size.width,
        size.height,
        options.fps,
        settings.mode
    );

    let (scope, summary) = render_pcm(&pcm, &settings, &options)?;
    save_png(&scope, output)?;

    println!(
        "Rendered {} ticks ({} with audio) to {}",
        summary.ticks,
        summary.ticks_with_frame,
        output.display()
    );
    if let Some(dir) = &options.frames_dir {
        println!("Wrote {} frames to {}", summary.frames_written, dir.display());
    }
    Ok(())
}
