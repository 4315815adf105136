//! Text frame projection.
//!
//! [`render`] turns an [`App`] into a [`TextFrame`]: one line per terminal
//! row, each tagged with a [`Tone`], plus the cursor position. Terminal
//! drivers map tones to colors; tests compare the plain text. Lines are
//! clipped to the terminal width.

use std::fmt;

use tchat_core::Conversation;

use crate::{App, CommandKind, ConnectionState, FieldId, Focus, NoticeLevel, Timeline, View};

/// Visual weight of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Regular text.
    Normal,
    /// View header.
    Title,
    /// Rules, hints, placeholders.
    Muted,
    /// Focused or in-progress elements.
    Accent,
    /// Failures.
    Error,
}

/// A single rendered row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLine {
    /// Row text, at most the terminal width in chars.
    pub text: String,
    /// How to style it.
    pub tone: Tone,
}

/// Rendered view: rows top to bottom and the cursor, if a field has focus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextFrame {
    lines: Vec<FrameLine>,
    cursor: Option<(u16, u16)>,
}

impl TextFrame {
    /// Rows top to bottom.
    pub fn lines(&self) -> &[FrameLine] {
        &self.lines
    }

    /// Cursor as (column, row). `None` when no field has focus.
    pub fn cursor(&self) -> Option<(u16, u16)> {
        self.cursor
    }
}

impl fmt::Display for TextFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(line.text.trim_end())?;
        }
        Ok(())
    }
}

/// Project the session state to a frame. One branch per view.
pub fn render(app: &App) -> TextFrame {
    let mut out = FrameBuilder::new(app.terminal_size().0);
    match app.view() {
        View::Login => login(app, &mut out),
        View::Chat => chat(app, &mut out),
        View::ChannelList => channel_list(app, &mut out),
        View::Settings => settings(app, &mut out),
    }
    out.frame
}

struct FrameBuilder {
    width: usize,
    frame: TextFrame,
}

impl FrameBuilder {
    fn new(width: u16) -> Self {
        Self { width: usize::from(width), frame: TextFrame::default() }
    }

    fn line(&mut self, tone: Tone, text: impl AsRef<str>) {
        let text = text.as_ref().chars().take(self.width).collect();
        self.frame.lines.push(FrameLine { text, tone });
    }

    fn blank(&mut self) {
        self.line(Tone::Normal, "");
    }

    fn rule(&mut self) {
        self.line(Tone::Muted, "-".repeat(self.width));
    }

    /// Place the cursor at `column` of the row pushed next.
    fn cursor_on_next_row(&mut self, column: usize) {
        let column = column.min(self.width.saturating_sub(1));
        let row = self.frame.lines.len();
        self.frame.cursor = Some((column as u16, row as u16));
    }
}

fn login(app: &App, out: &mut FrameBuilder) {
    out.line(Tone::Title, "tchat - log in");
    out.rule();
    labeled_field(app, out, FieldId::Username, Focus::UsernameInput);
    labeled_field(app, out, FieldId::Password, Focus::PasswordInput);
    out.blank();
    match app.login_error() {
        Some(error) => out.line(Tone::Error, error),
        None => out.blank(),
    }
    status(app, out, "Tab field | Enter log in | ^C quit");
}

fn chat(app: &App, out: &mut FrameBuilder) {
    let username = app.session().user().map_or("?", |u| u.username.as_str());

    let connection = connection_label(app.connection_state());
    let mut header = format!("{} | {username} | {connection}", app.conversation());
    let mut unread: Vec<String> = app.unread().iter().map(ToString::to_string).collect();
    unread.sort();
    if !unread.is_empty() {
        header.push_str(" | unread: ");
        header.push_str(&unread.join(", "));
    }
    out.line(Tone::Title, header);
    out.rule();

    let visible = app.visible_count();
    let messages = app.timeline().map(Timeline::visible).unwrap_or_default();
    if messages.is_empty() {
        out.line(Tone::Muted, "No messages yet");
    }
    for message in messages {
        let at = message.sent_at.clock_time();
        out.line(Tone::Normal, format!("[{at}] {}: {}", message.author_label(), message.body));
    }
    for _ in messages.len().max(1)..visible {
        out.blank();
    }

    match app.echo().filter(|echo| &echo.conversation == app.conversation()) {
        Some(echo) => out.line(Tone::Muted, format!("[sending] {username}: {}", echo.body)),
        None => out.blank(),
    }
    out.rule();

    let field = app.fields().get(FieldId::Message);
    if app.focus() == Focus::MessageInput {
        out.cursor_on_next_row(2 + field.cursor());
    }
    if field.is_empty() {
        out.line(Tone::Muted, format!("> {}", field.placeholder()));
    } else {
        out.line(Tone::Normal, format!("> {}", field.display()));
    }
    status(app, out, "^L channels | ^O settings | ^C quit");
}

fn channel_list(app: &App, out: &mut FrameBuilder) {
    out.line(Tone::Title, "Channels");
    out.rule();
    labeled_field(app, out, FieldId::ChannelSearch, Focus::ChannelSearchInput);
    out.rule();

    let channels = app.filtered_channels();
    if channels.is_empty() {
        let text = if app.dispatcher().is_pending(CommandKind::FetchChannels) {
            CommandKind::FetchChannels.progress_label()
        } else if app.channels().is_empty() {
            "No channels"
        } else {
            "No matching channels"
        };
        out.line(Tone::Muted, text);
    }

    let list_focused = app.focus() == Focus::ChannelList;
    for (i, channel) in channels.iter().enumerate() {
        let selected = i == app.selected_channel();
        let marker = if selected { "> " } else { "  " };
        let unread = if app.unread().contains(&Conversation::Channel(channel.id.clone())) {
            " *"
        } else {
            ""
        };
        let mut text = format!("{marker}#{}{unread}", channel.name);
        if !channel.description.is_empty() {
            text.push_str(" - ");
            text.push_str(&channel.description);
        }
        let tone = if selected && list_focused { Tone::Accent } else { Tone::Normal };
        out.line(tone, text);
    }
    status(app, out, "Tab switch | Enter open | Esc back");
}

fn settings(app: &App, out: &mut FrameBuilder) {
    out.line(Tone::Title, "Settings");
    out.rule();
    if let Some(user) = app.session().user() {
        out.line(Tone::Normal, format!("User: {}", user.username));
        out.line(Tone::Normal, format!("Email: {}", user.email));
    }
    out.line(Tone::Normal, format!("Connection: {}", connection_label(app.connection_state())));

    let config = app.config();
    if config.poll_interval.is_zero() {
        out.line(Tone::Normal, "Polling: off");
    } else {
        out.line(Tone::Normal, format!("Polling: every {}s", config.poll_interval.as_secs()));
    }
    out.line(Tone::Normal, format!("Stale after: {}s", config.stale_after.as_secs()));
    out.blank();
    status(app, out, "l log out | Esc back");
}

/// `Label: value` row with a focus marker. Masked fields show glyphs.
fn labeled_field(app: &App, out: &mut FrameBuilder, id: FieldId, target: Focus) {
    let field = app.fields().get(id);
    let focused = app.focus() == target;
    let label = format!("{}{}: ", if focused { "> " } else { "  " }, field.placeholder());
    if focused {
        out.cursor_on_next_row(label.chars().count() + field.cursor());
    }
    let tone = if focused { Tone::Accent } else { Tone::Normal };
    out.line(tone, format!("{label}{}", field.display()));
}

/// Bottom row: notice, else pending ops, else key hints.
fn status(app: &App, out: &mut FrameBuilder, hint: &str) {
    if let Some(notice) = app.notice() {
        let tone = match notice.level {
            NoticeLevel::Info => Tone::Muted,
            NoticeLevel::Wait => Tone::Accent,
            NoticeLevel::Error => Tone::Error,
        };
        out.line(tone, &notice.text);
        return;
    }

    let stale_after = app.config().stale_after;
    let pending: Vec<String> = app
        .dispatcher()
        .pending_ops()
        .map(|op| {
            let label = op.kind.progress_label();
            if op.is_stale(app.now(), stale_after) {
                format!("{label} (stale, ^X cancels)")
            } else {
                label.to_string()
            }
        })
        .collect();
    if pending.is_empty() {
        out.line(Tone::Muted, hint);
    } else {
        out.line(Tone::Accent, pending.join(" "));
    }
}

fn connection_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Disconnected => "offline",
        ConnectionState::Connecting => "connecting",
        ConnectionState::Connected => "online",
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tchat_core::{AccessToken, Channel, ChannelId, Message, MessageId, Timestamp, User, UserId};

    use super::*;
    use crate::{AppAction, AppConfig, AppEvent, KeyInput, OpHandle, app::default_conversation};

    const T0: Timestamp = Timestamp::from_millis(1_700_000_000_000);

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle(AppEvent::Key(KeyInput::Char(ch)));
        }
    }

    fn first_handle(actions: &[AppAction]) -> OpHandle {
        match actions.iter().find_map(|a| match a {
            AppAction::Dispatch(command) => Some(command.handle),
            _ => None,
        }) {
            Some(handle) => handle,
            None => panic!("nothing dispatched in {actions:?}"),
        }
    }

    fn message(id: &str, author: &str, body: &str, sent_at: Timestamp) -> Message {
        Message {
            id: MessageId::from(id),
            body: body.into(),
            author_id: UserId::from(author),
            author_name: Some(author.into()),
            conversation: default_conversation(),
            sent_at,
        }
    }

    /// 40x10 terminal, logged in as `demo`, two messages in #general.
    fn chat_app() -> App {
        let mut app = App::new(AppConfig::default(), T0);
        app.handle(AppEvent::Resize(40, 10));
        type_text(&mut app, "demo");
        app.handle(AppEvent::Key(KeyInput::Tab));
        type_text(&mut app, "demo");
        let login = first_handle(&app.handle(AppEvent::Key(KeyInput::Enter)));

        let user = User {
            id: UserId::from("demo"),
            username: "demo".into(),
            email: "demo@example.com".into(),
        };
        let actions = app.handle(AppEvent::LoginSucceeded {
            handle: login,
            token: AccessToken::new("token"),
            user,
            expires_at: None,
        });
        app.handle(AppEvent::HistoryFetched {
            handle: first_handle(&actions),
            conversation: default_conversation(),
            messages: vec![
                message("2", "demo", "hello", T0.saturating_add(Duration::from_secs(60))),
                message("1", "alice", "hi", T0),
            ],
        });
        app
    }

    #[test]
    fn login_frame_masks_password() {
        let mut app = App::new(AppConfig::default(), T0);
        app.handle(AppEvent::Resize(40, 10));
        type_text(&mut app, "demo");
        app.handle(AppEvent::Key(KeyInput::Tab));
        type_text(&mut app, "pw");

        let frame = app.current_frame();
        insta::assert_snapshot!(frame.to_string(), @r"
        tchat - log in
        ----------------------------------------
          Username: demo
        > Password: **


        Tab field | Enter log in | ^C quit
        ");
        assert_eq!(frame.cursor(), Some((14, 3)));
    }

    #[test]
    fn login_frame_shows_error() {
        let mut app = App::new(AppConfig::default(), T0);
        app.handle(AppEvent::Resize(40, 10));
        app.handle(AppEvent::Key(KeyInput::Tab));
        app.handle(AppEvent::Key(KeyInput::Enter));

        let frame = app.current_frame();
        let error = frame.lines().get(5);
        assert_eq!(error.map(|l| l.text.as_str()), Some("Username and password are required"));
        assert_eq!(error.map(|l| l.tone), Some(Tone::Error));
    }

    #[test]
    fn chat_frame_shows_timeline_in_order() {
        let app = chat_app();
        insta::assert_snapshot!(app.current_frame().to_string(), @r"
        #general | demo | online
        ----------------------------------------
        [22:13] alice: hi
        [22:14] demo: hello



        ----------------------------------------
        > Type a message...
        ^L channels | ^O settings | ^C quit
        ");
        assert_eq!(app.current_frame().lines().len(), 10);
    }

    #[test]
    fn chat_frame_shows_echo_while_sending() {
        let mut app = chat_app();
        type_text(&mut app, "yo");
        app.handle(AppEvent::Key(KeyInput::Enter));

        let frame = app.current_frame();
        insta::assert_snapshot!(frame.to_string(), @r"
        #general | demo | online
        ----------------------------------------
        [22:13] alice: hi
        [22:14] demo: hello


        [sending] demo: yo
        ----------------------------------------
        > Type a message...
        Sending...
        ");
        assert_eq!(frame.cursor(), Some((2, 8)));
    }

    #[test]
    fn stale_op_is_marked() {
        let mut app = chat_app();
        type_text(&mut app, "yo");
        app.handle(AppEvent::Key(KeyInput::Enter));
        app.handle(AppEvent::Tick { now: T0.saturating_add(Duration::from_secs(16)) });

        let frame = app.current_frame();
        let status = frame.lines().last().map(|l| l.text.clone()).unwrap_or_default();
        assert!(status.starts_with("Sending... (stale, ^X cancels)"), "{status}");
    }

    #[test]
    fn channel_list_frame_marks_selection() {
        let mut app = chat_app();
        let actions = app.handle(AppEvent::Key(KeyInput::Ctrl('l')));
        assert!(app.current_frame().to_string().contains("Loading channels..."));

        let channel = |id: &str, description: &str| Channel {
            id: ChannelId::from(id),
            name: id.into(),
            description: description.into(),
            members: vec![],
        };
        app.handle(AppEvent::ChannelsFetched {
            handle: first_handle(&actions),
            channels: vec![channel("general", "General chat"), channel("random", "")],
        });
        app.handle(AppEvent::Key(KeyInput::Down));

        insta::assert_snapshot!(app.current_frame().to_string(), @r"
        Channels
        ----------------------------------------
        > Search:
        ----------------------------------------
          #general - General chat
        > #random
        Tab switch | Enter open | Esc back
        ");
    }

    #[test]
    fn settings_frame_lists_account() {
        let mut app = chat_app();
        app.handle(AppEvent::Key(KeyInput::Ctrl('o')));

        let frame = app.current_frame();
        insta::assert_snapshot!(frame.to_string(), @r"
        Settings
        ----------------------------------------
        User: demo
        Email: demo@example.com
        Connection: online
        Polling: every 5s
        Stale after: 15s

        l log out | Esc back
        ");
        assert_eq!(frame.cursor(), None);
    }

    #[test]
    fn render_is_idempotent() {
        let app = chat_app();
        assert_eq!(app.current_frame(), app.current_frame());
    }

    #[test]
    fn lines_are_clipped_to_width() {
        let mut app = chat_app();
        app.handle(AppEvent::Resize(10, 10));
        assert!(app.current_frame().lines().iter().all(|l| l.text.chars().count() <= 10));
    }
}
