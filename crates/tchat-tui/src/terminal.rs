//! Terminal driver for the TUI.
//!
//! Implements the [`Driver`] trait for terminal I/O using crossterm for
//! keyboard and resize events and ratatui for drawing.

use std::io::{self, Stdout, stdout};

use crossterm::{
    ExecutableCommand,
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use tchat_app::{App, AppEvent, Driver, KeyInput};
use thiserror::Error;

use crate::ui;

/// Terminal driver errors.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// I/O error from terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The terminal event stream ended.
    #[error("terminal input closed")]
    InputClosed,
}

/// Terminal driver implementing the [`Driver`] trait.
///
/// Enters raw mode and the alternate screen on creation and restores the
/// terminal when dropped.
pub struct TerminalDriver {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    event_stream: EventStream,
    /// Initial size, reported as the first event.
    pending: Option<AppEvent>,
    stopped: bool,
}

impl TerminalDriver {
    /// Take over the terminal.
    pub fn new() -> Result<Self, TerminalError> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;
        let size = terminal.size()?;

        Ok(Self {
            terminal,
            event_stream: EventStream::new(),
            pending: Some(AppEvent::Resize(size.width, size.height)),
            stopped: false,
        })
    }

    fn restore(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Convert a crossterm event. `None` for events the session ignores.
pub fn convert_event(event: Event) -> Option<AppEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => convert_key(key).map(AppEvent::Key),
        Event::Resize(cols, rows) => Some(AppEvent::Resize(cols, rows)),
        _ => None,
    }
}

/// Convert a crossterm key event to `KeyInput`.
pub fn convert_key(key: KeyEvent) -> Option<KeyInput> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char(c) => Some(KeyInput::Ctrl(c.to_ascii_lowercase())),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Char(c) => Some(KeyInput::Char(c)),
        KeyCode::Enter => Some(KeyInput::Enter),
        KeyCode::Backspace => Some(KeyInput::Backspace),
        KeyCode::Delete => Some(KeyInput::Delete),
        KeyCode::Tab => Some(KeyInput::Tab),
        KeyCode::Esc => Some(KeyInput::Esc),
        KeyCode::Left => Some(KeyInput::Left),
        KeyCode::Right => Some(KeyInput::Right),
        KeyCode::Up => Some(KeyInput::Up),
        KeyCode::Down => Some(KeyInput::Down),
        KeyCode::PageUp => Some(KeyInput::PageUp),
        KeyCode::PageDown => Some(KeyInput::PageDown),
        KeyCode::Home => Some(KeyInput::Home),
        KeyCode::End => Some(KeyInput::End),
        _ => None,
    }
}

impl Driver for TerminalDriver {
    type Error = TerminalError;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        if let Some(event) = self.pending.take() {
            return Ok(Some(event));
        }
        match self.event_stream.next().await {
            Some(Ok(event)) => Ok(convert_event(event)),
            Some(Err(e)) => Err(TerminalError::Io(e)),
            None => Err(TerminalError::InputClosed),
        }
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        let text = app.current_frame();
        self.terminal.draw(|frame| ui::draw(frame, &text))?;
        Ok(())
    }

    fn stop(&mut self) {
        self.restore();
    }
}

impl Drop for TerminalDriver {
    fn drop(&mut self) {
        self.restore();
    }
}
