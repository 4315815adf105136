//! Drawing
//!
//! Paints a [`TextFrame`] onto a ratatui frame. Layout is decided by
//! [`tchat_app::render`]; this module only maps tones to styles and places
//! the cursor.

use ratatui::{
    Frame,
    style::{Color, Modifier, Style},
    text::Line,
    widgets::Paragraph,
};
use tchat_app::{TextFrame, Tone};

/// Draw `text` over the whole frame.
pub fn draw(frame: &mut Frame, text: &TextFrame) {
    let lines: Vec<Line> = text
        .lines()
        .iter()
        .map(|line| Line::styled(line.text.as_str(), tone_style(line.tone)))
        .collect();
    frame.render_widget(Paragraph::new(lines), frame.area());

    if let Some(position) = text.cursor() {
        frame.set_cursor_position(position);
    }
}

/// Terminal style of a tone.
pub fn tone_style(tone: Tone) -> Style {
    match tone {
        Tone::Normal => Style::default(),
        Tone::Title => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        Tone::Muted => Style::default().fg(Color::DarkGray),
        Tone::Accent => Style::default().fg(Color::Yellow),
        Tone::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}
