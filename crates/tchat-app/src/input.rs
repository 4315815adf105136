//! Terminal-agnostic keyboard input.

/// Keyboard input abstraction.
///
/// Decouples session logic from terminal libraries (crossterm, termion,
/// etc.) enabling deterministic simulation testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Printable character.
    Char(char),
    /// Character pressed together with Control (lowercase).
    Ctrl(char),
    /// Enter/Return key (submit, select).
    Enter,
    /// Backspace key (delete character before cursor).
    Backspace,
    /// Delete key (delete character at cursor).
    Delete,
    /// Tab key (advance focus).
    Tab,
    /// Escape key (back).
    Esc,
    /// Left arrow key.
    Left,
    /// Right arrow key.
    Right,
    /// Up arrow key.
    Up,
    /// Down arrow key.
    Down,
    /// Page Up key.
    PageUp,
    /// Page Down key.
    PageDown,
    /// Home key (cursor to start).
    Home,
    /// End key (cursor to end).
    End,
}
