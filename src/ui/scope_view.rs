//! Terminal presentation of the scope surface.
//!
//! Every terminal cell shows two vertically stacked pixels using the upper
//! half block glyph: the foreground paints the top pixel and the background
//! the bottom one. Each of those pixels is the average of a square block of
//! surface pixels, so the surface is rendered at `pixels_per_cell` times the
//! terminal resolution and then downsampled.

use crate::scope::{CanvasSize, RenderMode};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    buffer::Buffer,
    prelude::*,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use std::io::{self, Stdout};
use std::time::Duration;
use tiny_skia::Pixmap;

const FOOTER_HEIGHT: u16 = 1;
const HALF_BLOCK: &str = "▀";
const FOOTER_FG: Color = Color::Rgb(0, 200, 0);
const FOOTER_BG: Color = Color::Rgb(0, 0, 0);

/// User input during a scope session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeCommand {
    /// No key pressed
    Continue,
    /// Leave the session (q, Escape or Ctrl+C)
    Quit,
    /// Pause or resume the waveform source (Space)
    TogglePlayback,
    /// Switch between time-domain and attractor (m)
    ToggleMode,
    /// Raise interpolation tension (+)
    TensionUp,
    /// Lower interpolation tension (-)
    TensionDown,
}

/// Values shown in the footer.
#[derive(Debug, Clone, Copy)]
pub struct StatusLine<'a> {
    pub mode: RenderMode,
    pub playing: bool,
    pub tension: f32,
    pub gain: f32,
    pub source: &'a str,
}

/// Draws a scope surface into a ratatui buffer with half-block cells.
pub struct SurfaceView<'a> {
    pixmap: Option<&'a Pixmap>,
    pixels_per_cell: u32,
}

impl<'a> SurfaceView<'a> {
    pub fn new(pixmap: Option<&'a Pixmap>, pixels_per_cell: u32) -> Self {
        Self {
            pixmap,
            pixels_per_cell: pixels_per_cell.max(1),
        }
    }
}

impl Widget for SurfaceView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let ppc = self.pixels_per_cell;
        for row in 0..area.height {
            for col in 0..area.width {
                let (top, bottom) = match self.pixmap {
                    Some(pixmap) => {
                        let x0 = u32::from(col) * ppc;
                        let y0 = u32::from(row) * 2 * ppc;
                        (
                            block_average(pixmap, x0, y0, ppc),
                            block_average(pixmap, x0, y0 + ppc, ppc),
                        )
                    }
                    None => ((0, 0, 0), (0, 0, 0)),
                };

                if let Some(cell) = buf.cell_mut((area.x + col, area.y + row)) {
                    cell.set_symbol(HALF_BLOCK)
                        .set_fg(Color::Rgb(top.0, top.1, top.2))
                        .set_bg(Color::Rgb(bottom.0, bottom.1, bottom.2));
                }
            }
        }
    }
}

/// Mean color of the `size`×`size` block at (`x0`, `y0`) composited over black.
///
/// Pixels outside the surface count as black.
fn block_average(pixmap: &Pixmap, x0: u32, y0: u32, size: u32) -> (u8, u8, u8) {
    let (width, height) = (pixmap.width(), pixmap.height());
    let pixels = pixmap.pixels();
    let (mut r, mut g, mut b) = (0u32, 0u32, 0u32);

    for y in y0..(y0 + size).min(height) {
        for x in x0..(x0 + size).min(width) {
            // Premultiplied over black is the stored color itself.
            let p = pixels[(y * width + x) as usize];
            r += u32::from(p.red());
            g += u32::from(p.green());
            b += u32::from(p.blue());
        }
    }

    let count = size * size;
    ((r / count) as u8, (g / count) as u8, (b / count) as u8)
}

/// Surface size for a scope area of `cols`×`rows` cells.
pub fn canvas_for_cells(cols: u16, rows: u16, pixels_per_cell: u32) -> CanvasSize {
    let ppc = pixels_per_cell.max(1);
    CanvasSize::new(u32::from(cols) * ppc, u32::from(rows) * 2 * ppc)
}

fn footer_line(status: &StatusLine<'_>) -> Line<'static> {
    let indicator = if status.playing {
        Span::styled("● ", Style::default().fg(Color::Green))
    } else {
        Span::styled("⏸ ", Style::default().fg(Color::Yellow))
    };

    Line::from(vec![
        indicator,
        Span::raw(format!("{} / ", status.mode)),
        Span::raw(format!("tension {:.2} / ", status.tension)),
        Span::raw(format!("gain {:.2}x / ", status.gain)),
        Span::raw(status.source.to_string()),
        Span::styled(
            "   space pause · m mode · +/- tension · q quit",
            Style::default().add_modifier(Modifier::DIM),
        ),
    ])
}

/// Full-screen terminal scope.
pub struct ScopeTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    pixels_per_cell: u32,
}

impl ScopeTui {
    /// Creates a new TUI instance and enters alternate screen mode.
    ///
    /// # Errors
    /// - If raw mode cannot be enabled or the alternate screen entered
    pub fn new(pixels_per_cell: u32) -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.hide_cursor()?;

        Ok(ScopeTui {
            terminal,
            pixels_per_cell: pixels_per_cell.max(1),
        })
    }

    /// Surface size that fills the terminal above the footer.
    ///
    /// # Errors
    /// - If the terminal size cannot be queried
    pub fn canvas_size(&self) -> anyhow::Result<CanvasSize> {
        let size = self.terminal.size()?;
        let rows = size.height.saturating_sub(FOOTER_HEIGHT);
        Ok(canvas_for_cells(size.width, rows, self.pixels_per_cell))
    }

    /// Draws the surface and footer.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render(&mut self, pixmap: Option<&Pixmap>, status: &StatusLine<'_>) -> anyhow::Result<()> {
        let ppc = self.pixels_per_cell;
        self.terminal.draw(|frame| {
            let area = frame.area();
            let scope_area = Rect {
                height: area.height.saturating_sub(FOOTER_HEIGHT),
                ..area
            };
            let footer_area = Rect {
                y: area.y + scope_area.height,
                height: area.height - scope_area.height,
                ..area
            };

            frame.render_widget(SurfaceView::new(pixmap, ppc), scope_area);
            frame.render_widget(
                Paragraph::new(footer_line(status))
                    .style(Style::default().fg(FOOTER_FG).bg(FOOTER_BG)),
                footer_area,
            );
        })?;
        Ok(())
    }

    /// Returns the command for a pending key press, without blocking.
    ///
    /// # Errors
    /// - If event polling fails
    pub fn handle_input(&mut self) -> anyhow::Result<ScopeCommand> {
        if !event::poll(Duration::ZERO)? {
            return Ok(ScopeCommand::Continue);
        }
        let Event::Key(key) = event::read()? else {
            return Ok(ScopeCommand::Continue);
        };
        if key.kind == KeyEventKind::Release {
            return Ok(ScopeCommand::Continue);
        }

        Ok(match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                tracing::debug!("Escape or 'q' pressed: quitting");
                ScopeCommand::Quit
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                tracing::debug!("Ctrl+C pressed: quitting");
                ScopeCommand::Quit
            }
            KeyCode::Char(' ') => ScopeCommand::TogglePlayback,
            KeyCode::Char('m') => ScopeCommand::ToggleMode,
            KeyCode::Char('+') | KeyCode::Char('=') => ScopeCommand::TensionUp,
            KeyCode::Char('-') | KeyCode::Char('_') => ScopeCommand::TensionDown,
            _ => ScopeCommand::Continue,
        })
    }

    /// Cleans up terminal state and exits alternate screen mode.
    ///
    /// # Errors
    /// - If raw mode cannot be disabled or the cursor shown
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for ScopeTui {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}
