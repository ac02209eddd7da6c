//! Terminal driver for the live waterfall.
//!
//! Owns the display store and the bank, drains spectral rows on each tick,
//! and turns keyboard and mouse events into pause, marker and quit actions.

use crate::dsp::{note_name, Bank};
use crate::pipeline::SpectralRow;
use crate::ui::waterfall::{column_to_bucket, WaterfallView, MARKER_COLOR};
use crate::waterfall::WaterfallStore;
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
        MouseButton, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::Paragraph,
};
use std::io::{stdout, Stdout};
use tokio::sync::mpsc::{self, error::TryRecvError};

/// Result of handling one input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiCommand {
    /// Keep running
    Continue,
    /// Leave the waterfall (q, Escape, Ctrl+C)
    Quit,
}

/// Live waterfall view with a one-line status footer.
pub struct WaterfallTui<B: Backend> {
    terminal: Terminal<B>,
    store: WaterfallStore,
    bank: Bank,
    /// Buckets marked with a left click; at most one pair
    markers: Vec<usize>,
    paused: bool,
    stream_ended: bool,
    source_name: String,
    /// Bucket under the mouse pointer
    cursor_bucket: Option<usize>,
    /// Where the waterfall was last drawn, for mapping mouse positions
    waterfall_area: Rect,
    /// Set when something visible changed since the last draw
    dirty: bool,
}

impl WaterfallTui<CrosstermBackend<Stdout>> {
    /// Enters raw mode, the alternate screen and mouse capture.
    ///
    /// # Errors
    /// - If the terminal cannot be initialized
    pub fn enter(store: WaterfallStore, bank: Bank, source_name: String) -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self::new(terminal, store, bank, source_name))
    }

    /// Restores the terminal to its normal state.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    /// - If cursor cannot be shown
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            DisableMouseCapture,
            LeaveAlternateScreen
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl<B: Backend> WaterfallTui<B> {
    pub fn new(terminal: Terminal<B>, store: WaterfallStore, bank: Bank, source_name: String) -> Self {
        Self {
            terminal,
            store,
            bank,
            markers: Vec::with_capacity(2),
            paused: false,
            stream_ended: false,
            source_name,
            cursor_bucket: None,
            waterfall_area: Rect::default(),
            dirty: true,
        }
    }

    /// Moves every queued spectral row into the store, unless paused.
    ///
    /// Returns the number of rows added. A closed channel marks the stream
    /// as ended and is logged once.
    pub fn drain(&mut self, rows: &mut mpsc::Receiver<SpectralRow>) -> usize {
        if self.paused {
            return 0;
        }

        let mut added = 0;
        loop {
            match rows.try_recv() {
                Ok(row) => {
                    self.store.add(&self.bank.apply(&row));
                    added += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.stream_ended {
                        tracing::info!("Spectral stream ended; display frozen");
                        self.stream_ended = true;
                        self.dirty = true;
                    }
                    break;
                }
            }
        }
        if added > 0 {
            self.dirty = true;
        }
        added
    }

    /// Whether rows, input or a resize changed the screen since the last draw.
    pub fn needs_redraw(&self) -> bool {
        self.dirty
    }

    /// Renders the waterfall and the footer.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn draw(&mut self) -> std::io::Result<()> {
        let footer = self.footer_line();
        let store = &self.store;
        let markers = &self.markers;
        let mut waterfall_area = self.waterfall_area;

        self.terminal.draw(|frame| {
            let area = frame.area();
            let footer_height = 1u16.min(area.height);

            waterfall_area = Rect {
                height: area.height - footer_height,
                ..area
            };
            frame.render_widget(WaterfallView::new(store, markers), waterfall_area);

            let footer_area = Rect {
                y: area.y + waterfall_area.height,
                height: footer_height,
                ..area
            };
            frame.render_widget(
                Paragraph::new(footer).style(
                    Style::default()
                        .fg(Color::Rgb(185, 207, 212))
                        .bg(Color::Rgb(0, 0, 0)),
                ),
                footer_area,
            );
        })?;

        self.waterfall_area = waterfall_area;
        self.dirty = false;
        Ok(())
    }

    /// Applies one terminal event.
    pub fn handle_event(&mut self, event: Event) -> UiCommand {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    tracing::debug!("Quit requested");
                    return UiCommand::Quit;
                }
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    tracing::debug!("Ctrl+C pressed: quitting");
                    return UiCommand::Quit;
                }
                KeyCode::Char(' ') => {
                    self.paused = !self.paused;
                    self.dirty = true;
                    tracing::debug!("Paused: {}", self.paused);
                }
                KeyCode::Char('r') => {
                    self.markers.clear();
                    self.store.reset_range();
                    self.dirty = true;
                }
                _ => {}
            },
            Event::Mouse(mouse) => {
                let bucket = self.bucket_at(mouse.column, mouse.row);
                match mouse.kind {
                    MouseEventKind::Down(MouseButton::Left) => {
                        if let Some(bucket) = bucket {
                            if self.markers.len() >= 2 {
                                self.markers.clear();
                            }
                            self.markers.push(bucket);
                            self.dirty = true;
                        }
                    }
                    MouseEventKind::Down(MouseButton::Right) => {
                        self.dirty |= !self.markers.is_empty();
                        self.markers.clear();
                    }
                    MouseEventKind::Moved | MouseEventKind::Drag(_) => {
                        self.dirty |= self.cursor_bucket != bucket;
                        self.cursor_bucket = bucket;
                    }
                    _ => {}
                }
            }
            Event::Resize(..) => self.dirty = true,
            _ => {}
        }
        UiCommand::Continue
    }

    /// Bucket under a terminal position, if it falls on the waterfall.
    fn bucket_at(&self, column: u16, row: u16) -> Option<usize> {
        let area = self.waterfall_area;
        let inside = column >= area.x
            && column < area.right()
            && row >= area.y
            && row < area.bottom();
        inside.then(|| column_to_bucket(column - area.x, area.width, self.store.width()))
    }

    fn footer_line(&self) -> Line<'static> {
        let indicator = if self.stream_ended {
            Span::styled("■ ", Style::default().fg(Color::Red))
        } else if self.paused {
            Span::styled("⏸ ", Style::default().fg(Color::Yellow))
        } else {
            Span::styled("● ", Style::default().fg(Color::Green))
        };

        let mut spans = vec![indicator, Span::raw(self.source_name.clone())];

        if let Some(hz) = self.cursor_bucket.and_then(|b| self.bank.bucket_center_hz(b)) {
            let note = note_name(hz).unwrap_or_default();
            spans.push(Span::raw(format!(" / {hz:.0} Hz {note}")));
        }

        if let Some((floor, ceiling)) = self.store.range() {
            spans.push(Span::raw(format!(" / range {floor:.2}..{ceiling:.2}")));
        }

        let marked: Vec<f32> = self
            .markers
            .iter()
            .filter_map(|&b| self.bank.bucket_center_hz(b))
            .collect();
        if !marked.is_empty() {
            let listed = marked
                .iter()
                .map(|hz| format!("{hz:.0} Hz"))
                .collect::<Vec<_>>()
                .join(" | ");
            spans.push(Span::raw(" / "));
            spans.push(Span::styled(listed, Style::default().fg(MARKER_COLOR)));
            if let [a, b] = marked.as_slice() {
                spans.push(Span::raw(format!(" ({:.0} Hz apart)", (b - a).abs())));
            }
        }

        Line::from(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, MouseEvent};
    use ratatui::backend::TestBackend;

    fn tui(width: u16, height: u16) -> WaterfallTui<TestBackend> {
        let bank = Bank::linear(44100, 4096, 0.0, 2000.0, 2).unwrap();
        let store = WaterfallStore::new(bank.output_width(), 8, 0.0);
        let terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        WaterfallTui::new(terminal, store, bank, "test-source".to_string())
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    fn footer_text(tui: &WaterfallTui<TestBackend>) -> String {
        let buffer = tui.terminal.backend().buffer();
        let y = buffer.area.height - 1;
        (0..buffer.area.width)
            .map(|x| buffer[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn test_quit_keys() {
        let mut tui = tui(40, 6);
        assert_eq!(tui.handle_event(key(KeyCode::Char('q'))), UiCommand::Quit);
        assert_eq!(tui.handle_event(key(KeyCode::Esc)), UiCommand::Quit);
        let ctrl_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(tui.handle_event(ctrl_c), UiCommand::Quit);
        assert_eq!(tui.handle_event(key(KeyCode::Char('c'))), UiCommand::Continue);
    }

    #[test]
    fn test_key_release_is_ignored() {
        let mut tui = tui(40, 6);
        let release = Event::Key(KeyEvent::new_with_kind(
            KeyCode::Char('q'),
            KeyModifiers::NONE,
            KeyEventKind::Release,
        ));
        assert_eq!(tui.handle_event(release), UiCommand::Continue);
    }

    #[tokio::test]
    async fn test_pause_stops_draining() {
        let mut tui = tui(40, 6);
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(vec![1.0; 2048]).await.unwrap();

        tui.handle_event(key(KeyCode::Char(' ')));
        assert!(tui.paused);
        assert_eq!(tui.drain(&mut rx), 0);

        tui.handle_event(key(KeyCode::Char(' ')));
        assert_eq!(tui.drain(&mut rx), 1);
        assert!(!tui.stream_ended);
    }

    #[tokio::test]
    async fn test_closed_stream_freezes_display() {
        let mut tui = tui(40, 6);
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(vec![0.5; 2048]).await.unwrap();
        drop(tx);

        assert_eq!(tui.drain(&mut rx), 1);
        assert!(tui.stream_ended);
        assert_eq!(tui.drain(&mut rx), 0);

        tui.draw().unwrap();
        assert!(footer_text(&tui).starts_with("■ test-source"));
        assert_eq!(tui.handle_event(key(KeyCode::Char(' '))), UiCommand::Continue);
    }

    #[test]
    fn test_markers_pair_and_clear() {
        let mut tui = tui(40, 6);
        tui.draw().unwrap();

        tui.handle_event(mouse(MouseEventKind::Down(MouseButton::Left), 10, 1));
        tui.handle_event(mouse(MouseEventKind::Down(MouseButton::Left), 20, 1));
        assert_eq!(tui.markers.len(), 2);

        tui.handle_event(mouse(MouseEventKind::Down(MouseButton::Left), 30, 1));
        assert_eq!(tui.markers.len(), 1);

        tui.handle_event(mouse(MouseEventKind::Down(MouseButton::Right), 0, 0));
        assert!(tui.markers.is_empty());
    }

    #[test]
    fn test_click_on_footer_adds_no_marker() {
        let mut tui = tui(40, 6);
        tui.draw().unwrap();
        tui.handle_event(mouse(MouseEventKind::Down(MouseButton::Left), 10, 5));
        assert!(tui.markers.is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_markers_and_range() {
        let mut tui = tui(40, 6);
        let (tx, mut rx) = mpsc::channel(4);
        tx.send((0..2048).map(|i| i as f32).collect()).await.unwrap();
        tui.drain(&mut rx);
        tui.draw().unwrap();
        tui.handle_event(mouse(MouseEventKind::Down(MouseButton::Left), 10, 1));
        assert!(tui.store.range().is_some());

        tui.handle_event(key(KeyCode::Char('r')));
        assert!(tui.markers.is_empty());
        assert!(tui.store.range().is_none());
    }

    #[test]
    fn test_footer_shows_frequency_under_cursor() {
        let mut tui = tui(60, 6);
        tui.draw().unwrap();
        assert!(footer_text(&tui).starts_with("● test-source"));

        tui.handle_event(mouse(MouseEventKind::Moved, 30, 2));
        tui.draw().unwrap();
        let footer = footer_text(&tui);
        assert!(footer.contains(" Hz "), "footer was {footer:?}");
    }

    #[tokio::test]
    async fn test_redraw_only_after_changes() {
        let mut tui = tui(40, 6);
        assert!(tui.needs_redraw());
        tui.draw().unwrap();
        assert!(!tui.needs_redraw());

        let (tx, mut rx) = mpsc::channel(4);
        assert_eq!(tui.drain(&mut rx), 0);
        assert!(!tui.needs_redraw());

        tx.send(vec![0.5; 2048]).await.unwrap();
        assert_eq!(tui.drain(&mut rx), 1);
        assert!(tui.needs_redraw());
        tui.draw().unwrap();

        tui.handle_event(mouse(MouseEventKind::Moved, 5, 1));
        assert!(tui.needs_redraw());
        tui.draw().unwrap();
        tui.handle_event(mouse(MouseEventKind::Moved, 5, 1));
        tui.handle_event(key(KeyCode::Char('x')));
        tui.handle_event(mouse(MouseEventKind::Down(MouseButton::Right), 5, 1));
        assert!(!tui.needs_redraw());

        tui.handle_event(Event::Resize(50, 8));
        assert!(tui.needs_redraw());
        tui.draw().unwrap();

        drop(tx);
        assert_eq!(tui.drain(&mut rx), 0);
        assert!(tui.needs_redraw());
    }

    #[test]
    fn test_marker_column_is_drawn() {
        let mut tui = tui(40, 6);
        tui.draw().unwrap();
        tui.handle_event(mouse(MouseEventKind::Down(MouseButton::Left), 12, 0));
        tui.draw().unwrap();

        let buffer = tui.terminal.backend().buffer();
        let marked = (0..buffer.area.width)
            .filter(|&x| buffer[(x, 0)].symbol() == "│")
            .count();
        assert_eq!(marked, 1);
    }
}
