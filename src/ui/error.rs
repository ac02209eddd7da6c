//! Full-screen error page shown when the waterfall cannot start.

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Paragraph, Wrap},
};
use std::io::{self, Stdout};
use std::time::Duration;

const BACKGROUND: Color = Color::Rgb(255, 0, 0);
const FOREGROUND: Color = Color::Rgb(255, 255, 255);

/// Red error page that waits for a key press.
pub struct ErrorScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl ErrorScreen {
    /// Enters the alternate screen in raw mode.
    ///
    /// # Errors
    /// - If the terminal cannot be initialized
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self {
            terminal,
            active: true,
        })
    }

    /// Shows `message` until any key is pressed.
    ///
    /// # Errors
    /// - If terminal rendering or event polling fails
    pub fn show_error(&mut self, message: &str) -> anyhow::Result<()> {
        loop {
            self.terminal
                .draw(|frame| render_error(frame.area(), frame.buffer_mut(), message))?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Leaves the alternate screen. Safe to call more than once.
    ///
    /// # Errors
    /// - If terminal mode cannot be restored
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
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

/// Paints a red page with `message` centered in the middle 80% of the width.
fn render_error(area: Rect, buf: &mut Buffer, message: &str) {
    buf.set_style(area, Style::default().bg(BACKGROUND));

    let text: Text = message
        .lines()
        .chain(["", "Press any key to exit"])
        .map(Line::from)
        .collect();
    let text_height = u16::try_from(text.height()).unwrap_or(u16::MAX);

    let padding_x = area.width / 10;
    let text_area = Rect {
        x: area.x + padding_x,
        y: area.y + area.height.saturating_sub(text_height) / 2,
        width: area.width - 2 * padding_x,
        height: area.height.min(text_height.max(1)),
    };

    Paragraph::new(text)
        .style(Style::default().fg(FOREGROUND).bg(BACKGROUND))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(text_area, buf);
}
