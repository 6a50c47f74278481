//! Full-screen error display.
//!
//! Used when a session cannot start (bad config, missing device, unreadable
//! file) so the message is visible even though the scope never took over the
//! terminal.

use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};
use std::io::{self, Stdout};

const BACKGROUND: Color = Color::Rgb(40, 0, 0);
const TITLE: Color = Color::Rgb(255, 96, 96);
const BODY: Color = Color::Rgb(230, 230, 230);
const HINT: Color = Color::Rgb(0, 200, 0);

/// Error screen with a centered title, message and hint.
pub struct ErrorScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl ErrorScreen {
    /// Creates a new error screen and enters alternate screen mode.
    ///
    /// # Errors
    /// - If raw mode cannot be enabled or the alternate screen entered
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(ErrorScreen { terminal })
    }

    /// Shows `title` and `message` until any key is pressed.
    ///
    /// # Errors
    /// - If terminal rendering or event polling fails
    pub fn show_error(&mut self, title: &str, message: &str, hint: &str) -> anyhow::Result<()> {
        loop {
            self.terminal.draw(|frame| {
                let area = frame.area();
                frame
                    .buffer_mut()
                    .set_style(area, Style::default().bg(BACKGROUND));

                let mut lines = vec![
                    Line::from(Span::styled(
                        title,
                        Style::default().fg(TITLE).add_modifier(Modifier::BOLD),
                    )),
                    Line::raw(""),
                ];
                lines.extend(
                    message
                        .lines()
                        .map(|l| Line::from(Span::styled(l, Style::default().fg(BODY)))),
                );
                lines.push(Line::raw(""));
                lines.push(Line::from(Span::styled(hint, Style::default().fg(HINT))));
                lines.push(Line::from(Span::styled(
                    "press any key",
                    Style::default().fg(BODY).add_modifier(Modifier::DIM),
                )));

                let height = (lines.len() as u16).min(area.height);
                let text_area = Rect {
                    x: area.x + area.width / 10,
                    y: area.y + area.height.saturating_sub(height) / 2,
                    width: area.width * 8 / 10,
                    height,
                };

                let paragraph = Paragraph::new(lines)
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true });
                frame.render_widget(paragraph, text_area);
            })?;

            if event::poll(std::time::Duration::from_millis(100))? {
                if let Event::Key(_) = event::read()? {
                    break;
                }
            }
        }

        Ok(())
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

impl Drop for ErrorScreen {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Shows an error screen and returns `err` for the caller to propagate.
///
/// Falls back to stderr when the terminal cannot be taken over.
pub fn report(title: &str, err: anyhow::Error, hint: &str) -> anyhow::Error {
    tracing::error!("{title}: {err:#}");
    let shown = ErrorScreen::new().and_then(|mut screen| {
        screen.show_error(title, &format!("{err:#}"), hint)?;
        screen.cleanup()
    });
    if shown.is_err() {
        eprintln!("{title}: {err:#}\n{hint}");
    }
    err.context(title.to_string())
}
