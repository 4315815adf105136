//! Session state machine.
//!
//! This module defines the [`App`] state machine, which owns every piece of
//! interactive state: the session, the view and focus, the input fields, the
//! per-conversation timelines and the pending-op slots.
//!
//! This is a pure state machine: it consumes [`crate::AppEvent`] inputs and
//! produces [`crate::AppAction`] instructions for the runtime to execute.
//! It never performs I/O, never sleeps and never reads the clock; time
//! arrives through [`AppEvent::Tick`].
//!
//! # Responsibilities
//!
//! - Routes keystrokes to the focused field or list.
//! - Applies view transitions and keeps focus legal for the active view.
//! - Dispatches network commands and reduces their results.
//! - Tracks token expiry, polling cadence and stale pending ops.

use std::collections::{HashMap, HashSet};

use tchat_core::{
    AccessToken, AuthError, Channel, ChannelId, Conversation, ErrorKind, Identity, Message,
    Timestamp, User,
};

use crate::{
    AppAction, AppConfig, AppEvent, Command, CommandKind, ConnectionState, DispatchError,
    Dispatcher, Echo, FieldId, FieldSet, Focus, FocusError, KeyInput, Notice, OpHandle, PendingOp,
    Request, Session, TextFrame, Timeline, Transition, View, ViewState,
    commands::{self, ComposeInput},
    render,
};

/// Rows of the chat view not taken by the timeline: header, two rules,
/// echo line, compose line and status line.
pub const CHAT_CHROME_ROWS: u16 = 6;

/// Conversation shown right after login.
pub fn default_conversation() -> Conversation {
    Conversation::Channel(ChannelId::from("general"))
}

/// Interactive session state machine.
///
/// Single owner of all UI and session state. No I/O dependencies - fully
/// testable in simulation.
#[derive(Debug, Clone)]
pub struct App {
    config: AppConfig,
    session: Session,
    view: ViewState,
    fields: FieldSet,
    dispatcher: Dispatcher,
    connection: ConnectionState,
    /// Read-only channel cache from the last fetch.
    channels: Vec<Channel>,
    /// Index into the filtered channel list.
    selected: usize,
    conversation: Conversation,
    timelines: HashMap<Conversation, Timeline>,
    /// Poll cursor per conversation: newest `sent_at` a history fetch
    /// returned. Sent messages never move it.
    cursors: HashMap<Conversation, Timestamp>,
    unread: HashSet<Conversation>,
    echo: Option<Echo>,
    notice: Option<Notice>,
    login_error: Option<String>,
    /// Terminal dimensions (columns, rows).
    terminal_size: (u16, u16),
    now: Timestamp,
    /// When history was last requested. `None` means a poll is due.
    last_poll: Option<Timestamp>,
}

impl App {
    /// Create a logged-out session on the Login view.
    pub fn new(config: AppConfig, now: Timestamp) -> Self {
        Self {
            config,
            session: Session::new(),
            view: ViewState::new(),
            fields: FieldSet::new(),
            dispatcher: Dispatcher::new(),
            connection: ConnectionState::Disconnected,
            channels: Vec::new(),
            selected: 0,
            conversation: default_conversation(),
            timelines: HashMap::new(),
            cursors: HashMap::new(),
            unread: HashSet::new(),
            echo: None,
            notice: None,
            login_error: None,
            terminal_size: (80, 24),
            now,
            last_poll: None,
        }
    }

    /// Process an event and return actions.
    ///
    /// After termination every event is dropped and no action is produced.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        if self.view.is_terminated() {
            tracing::debug!(handle = ?event.handle(), "session terminated, dropping event");
            return vec![];
        }

        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Tick { now } => self.tick(now),
            AppEvent::Resize(cols, rows) => {
                self.resize(cols, rows);
                vec![AppAction::Render]
            },
            AppEvent::Quit => self.quit(),
            AppEvent::SessionResumed { identity, expires_at } => self.resume(identity, expires_at),
            AppEvent::LoginSucceeded { handle, token, user, expires_at } => {
                if !self.dispatcher.complete(CommandKind::Login, handle) {
                    return vec![];
                }
                self.connection = ConnectionState::Connected;
                let Some(mut actions) = self.start_session(token, user, expires_at) else {
                    return vec![AppAction::Render];
                };
                if let Some(identity) = self.session.identity() {
                    actions.insert(0, AppAction::PersistIdentity(identity));
                }
                actions
            },
            AppEvent::LoginFailed { handle, reason } => {
                if !self.dispatcher.complete(CommandKind::Login, handle) {
                    return vec![];
                }
                self.connection = ConnectionState::Connected;
                self.login_error = Some(reason);
                self.view.apply(Transition::LoginFailed);
                vec![AppAction::Render]
            },
            AppEvent::MessageSent { handle, message } => {
                if !self.dispatcher.complete(CommandKind::SendMessage, handle) {
                    return vec![];
                }
                self.connection = ConnectionState::Connected;
                self.echo.take_if(|echo| echo.handle == handle);
                let conversation = message.conversation.clone();
                self.insert_messages(conversation, [message]);
                vec![AppAction::Render]
            },
            AppEvent::HistoryFetched { handle, conversation, messages } => {
                if !self.dispatcher.complete(CommandKind::FetchHistory, handle) {
                    return vec![];
                }
                self.connection = ConnectionState::Connected;
                self.advance_cursor(&conversation, &messages);
                let inserted = self.insert_messages(conversation, messages);
                tracing::debug!(%handle, inserted, "history merged");
                vec![AppAction::Render]
            },
            AppEvent::ChannelsFetched { handle, channels } => {
                if !self.dispatcher.complete(CommandKind::FetchChannels, handle) {
                    return vec![];
                }
                self.connection = ConnectionState::Connected;
                self.channels = channels;
                self.clamp_selection();
                vec![AppAction::Render]
            },
            AppEvent::OperationFailed { handle, kind, error, detail } => {
                self.operation_failed(handle, kind, error, &detail)
            },
        }
    }

    /// Move focus to `target`.
    ///
    /// Fails with [`FocusError`] and leaves focus unchanged if `target` is
    /// not legal for the active view.
    pub fn set_focus(&mut self, target: Focus) -> Result<(), FocusError> {
        self.view.set_focus(target)
    }

    /// Render the current state. Pure; identical state yields an identical
    /// frame.
    pub fn current_frame(&self) -> TextFrame {
        render::render(self)
    }

    /// Active view.
    pub fn view(&self) -> View {
        self.view.view()
    }

    /// Focused target.
    pub fn focus(&self) -> Focus {
        self.view.focus()
    }

    /// True once the session has been terminated by a quit.
    pub fn is_terminated(&self) -> bool {
        self.view.is_terminated()
    }

    /// Authentication state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Reducer tunables.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// All input fields.
    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Pending-op bookkeeping.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Pending ops outstanding for at least the stale threshold.
    pub fn stale_ops(&self) -> Vec<PendingOp> {
        self.dispatcher.stale(self.now, self.config.stale_after)
    }

    /// Last observed server reachability.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    /// Channel cache from the last fetch.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Channels matching the search field (case-insensitive substring of
    /// the name).
    pub fn filtered_channels(&self) -> Vec<&Channel> {
        let query = self.fields.value(FieldId::ChannelSearch).trim().to_lowercase();
        self.channels.iter().filter(|c| c.name.to_lowercase().contains(&query)).collect()
    }

    /// Index of the selected entry in [`App::filtered_channels`].
    pub fn selected_channel(&self) -> usize {
        self.selected
    }

    /// Conversation shown in the chat view.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Timeline of the current conversation, if anything was loaded.
    pub fn timeline(&self) -> Option<&Timeline> {
        self.timelines.get(&self.conversation)
    }

    /// Every loaded timeline.
    pub fn timelines(&self) -> &HashMap<Conversation, Timeline> {
        &self.timelines
    }

    /// Conversations with messages the user has not looked at.
    pub fn unread(&self) -> &HashSet<Conversation> {
        &self.unread
    }

    /// Optimistic echo of the message being sent.
    pub fn echo(&self) -> Option<&Echo> {
        self.echo.as_ref()
    }

    /// Transient banner. `None` if nothing to show.
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Reason the last login attempt failed.
    pub fn login_error(&self) -> Option<&str> {
        self.login_error.as_deref()
    }

    /// Terminal dimensions (columns, rows).
    pub fn terminal_size(&self) -> (u16, u16) {
        self.terminal_size
    }

    /// Time of the last tick.
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Messages the chat view can show at once.
    pub fn visible_count(&self) -> usize {
        usize::from(self.terminal_size.1.saturating_sub(CHAT_CHROME_ROWS).max(1))
    }

    fn handle_key(&mut self, key: KeyInput) -> Vec<AppAction> {
        self.notice = None;

        match key {
            KeyInput::Ctrl('c') => return self.quit(),
            KeyInput::Ctrl('x') => return self.cancel_stale(),
            KeyInput::Tab => {
                self.view.advance_focus();
                return vec![AppAction::Render];
            },
            _ => {},
        }

        match self.view.view() {
            View::Login => match key {
                KeyInput::Enter => self.submit_login(),
                _ => self.edit_focused(key),
            },
            View::Chat => match key {
                KeyInput::Enter => self.submit_compose(),
                KeyInput::Ctrl('l') => self.open_channel_list(),
                KeyInput::Ctrl('o') => self.open_settings(),
                KeyInput::Up => self.scroll(-1),
                KeyInput::Down => self.scroll(1),
                KeyInput::PageUp => self.scroll(-self.page()),
                KeyInput::PageDown => self.scroll(self.page()),
                _ => self.edit_focused(key),
            },
            View::ChannelList => match key {
                KeyInput::Esc => self.close(Transition::CloseChannelList),
                KeyInput::Enter => self.select_channel(),
                KeyInput::Up => self.move_selection(false),
                KeyInput::Down => self.move_selection(true),
                _ => {
                    let before = self.fields.value(FieldId::ChannelSearch).to_string();
                    let actions = self.edit_focused(key);
                    if self.fields.value(FieldId::ChannelSearch) != before {
                        self.selected = 0;
                    }
                    actions
                },
            },
            View::Settings => match key {
                KeyInput::Esc => self.close(Transition::CloseSettings),
                KeyInput::Char('l') => self.logout(),
                _ => vec![],
            },
        }
    }

    /// Apply an editing key to the focused field. Ignored when the focus
    /// has no field.
    fn edit_focused(&mut self, key: KeyInput) -> Vec<AppAction> {
        let Some(id) = self.view.focus().field() else {
            return vec![];
        };
        let field = self.fields.get_mut(id);
        match key {
            KeyInput::Char(ch) => {
                field.insert_char(ch);
            },
            KeyInput::Backspace => {
                field.delete_backward();
            },
            KeyInput::Delete => {
                field.delete_forward();
            },
            KeyInput::Left => field.move_left(),
            KeyInput::Right => field.move_right(),
            KeyInput::Home => field.move_home(),
            KeyInput::End => field.move_end(),
            _ => return vec![],
        }
        vec![AppAction::Render]
    }

    fn submit_login(&mut self) -> Vec<AppAction> {
        if self.view.focus() == Focus::UsernameInput && self.fields.get(FieldId::Password).is_empty()
        {
            self.view.advance_focus();
            return vec![AppAction::Render];
        }

        let username = self.fields.value(FieldId::Username).trim().to_string();
        let password = self.fields.value(FieldId::Password).to_string();
        if username.is_empty() || password.is_empty() {
            self.login_error = Some("Username and password are required".into());
            return vec![AppAction::Render];
        }

        self.login_error = None;
        match self.dispatch(Request::Login { username, password }) {
            Ok(command) => vec![AppAction::Dispatch(command), AppAction::Render],
            Err(error) => {
                self.reject(error);
                vec![AppAction::Render]
            },
        }
    }

    fn submit_compose(&mut self) -> Vec<AppAction> {
        let input = self.fields.value(FieldId::Message).to_string();
        match commands::parse(&input) {
            ComposeInput::Message(body) => self.send_message(&body),
            ComposeInput::Direct(peer) => {
                self.fields.clear(FieldId::Message);
                self.switch_conversation(Conversation::Direct(peer))
            },
            ComposeInput::Channels => {
                self.fields.clear(FieldId::Message);
                self.open_channel_list()
            },
            ComposeInput::Settings => {
                self.fields.clear(FieldId::Message);
                self.open_settings()
            },
            ComposeInput::Quit => self.quit(),
            ComposeInput::Invalid(hint) => {
                self.notice = Some(Notice::error(hint));
                vec![AppAction::Render]
            },
        }
    }

    /// Dispatch a send for the compose line. The field clears only once the
    /// command is accepted.
    fn send_message(&mut self, body: &str) -> Vec<AppAction> {
        let body = body.trim().to_string();
        let (token, sender) = match (self.session.token(), self.session.user()) {
            (Some(token), Some(user)) => (token.clone(), user.id.clone()),
            _ => {
                self.reject(DispatchError::NotAuthenticated);
                return vec![AppAction::Render];
            },
        };

        let conversation = self.conversation.clone();
        let request = Request::SendMessage {
            token,
            sender,
            conversation: conversation.clone(),
            body: body.clone(),
        };

        match self.dispatch(request) {
            Ok(command) => {
                self.fields.clear(FieldId::Message);
                self.echo = Some(Echo { handle: command.handle, conversation, body });
                vec![AppAction::Dispatch(command), AppAction::Render]
            },
            Err(error) => {
                self.reject(error);
                vec![AppAction::Render]
            },
        }
    }

    fn open_channel_list(&mut self) -> Vec<AppAction> {
        if !self.view.apply(Transition::OpenChannelList) {
            return vec![];
        }
        self.fields.clear(FieldId::ChannelSearch);
        self.selected = 0;

        let mut actions = Vec::new();
        if let Some(token) = self.session.token().cloned() {
            match self.dispatch(Request::FetchChannels { token }) {
                Ok(command) => actions.push(AppAction::Dispatch(command)),
                // The in-flight fetch will still populate the list
                Err(error) => tracing::debug!(%error, "channel refresh skipped"),
            }
        }
        actions.push(AppAction::Render);
        actions
    }

    fn select_channel(&mut self) -> Vec<AppAction> {
        let Some(id) = self.filtered_channels().get(self.selected).map(|c| c.id.clone()) else {
            return vec![];
        };
        if !self.view.apply(Transition::SelectChannel) {
            return vec![];
        }
        self.switch_conversation(Conversation::Channel(id))
    }

    fn switch_conversation(&mut self, conversation: Conversation) -> Vec<AppAction> {
        tracing::debug!(%conversation, "switching conversation");
        self.unread.remove(&conversation);
        let visible = self.visible_count();
        self.timelines.entry(conversation.clone()).or_insert_with(|| Timeline::new(visible));
        self.conversation = conversation.clone();

        let mut actions = Vec::new();
        actions.extend(self.fetch_history(conversation).map(AppAction::Dispatch));
        actions.push(AppAction::Render);
        actions
    }

    fn open_settings(&mut self) -> Vec<AppAction> {
        if self.view.apply(Transition::OpenSettings) { vec![AppAction::Render] } else { vec![] }
    }

    fn close(&mut self, transition: Transition) -> Vec<AppAction> {
        if self.view.apply(transition) { vec![AppAction::Render] } else { vec![] }
    }

    fn logout(&mut self) -> Vec<AppAction> {
        if !self.view.apply(Transition::Logout) {
            return vec![];
        }
        tracing::info!("logged out");
        let mut actions = self.end_session();
        self.notice = Some(Notice::info("Logged out"));
        actions.push(AppAction::Render);
        actions
    }

    fn expire(&mut self) -> Vec<AppAction> {
        if !self.session.is_authenticated() || !self.view.apply(Transition::SessionExpired) {
            return vec![];
        }
        tracing::info!("session expired");
        // The unsent draft survives into the next login
        let draft = self.fields.value(FieldId::Message).to_owned();
        let mut actions = self.end_session();
        self.fields.set_value(FieldId::Message, &draft);
        self.login_error = Some(AuthError::TokenExpired.to_string());
        actions.push(AppAction::Render);
        actions
    }

    fn quit(&mut self) -> Vec<AppAction> {
        if !self.view.apply(Transition::Quit) {
            return vec![];
        }
        let mut actions = self.cancel_all();
        actions.push(AppAction::Quit);
        actions
    }

    /// Cancel pending ops, forget the session and everything fetched with
    /// it. The username stays for the next login.
    fn end_session(&mut self) -> Vec<AppAction> {
        let mut actions = self.cancel_all();
        self.session.clear();
        self.channels.clear();
        self.selected = 0;
        self.timelines.clear();
        self.cursors.clear();
        self.unread.clear();
        self.echo = None;
        self.last_poll = None;
        self.conversation = default_conversation();
        self.fields.clear(FieldId::Password);
        self.fields.clear(FieldId::Message);
        self.fields.clear(FieldId::ChannelSearch);
        actions.push(AppAction::ClearIdentity);
        actions
    }

    fn cancel_all(&mut self) -> Vec<AppAction> {
        self.dispatcher
            .cancel_all()
            .into_iter()
            .map(|op| {
                tracing::debug!(handle = %op.handle, kind = ?op.kind, "cancelling command");
                AppAction::Cancel { handle: op.handle }
            })
            .collect()
    }

    fn cancel_stale(&mut self) -> Vec<AppAction> {
        let cancelled = self.dispatcher.cancel_stale(self.now, self.config.stale_after);
        if cancelled.is_empty() {
            return vec![AppAction::Render];
        }

        let mut actions = Vec::with_capacity(cancelled.len() + 1);
        for op in &cancelled {
            tracing::info!(handle = %op.handle, kind = ?op.kind, "cancelled stale command");
            if op.kind == CommandKind::SendMessage {
                self.restore_echo(op.handle);
            }
            actions.push(AppAction::Cancel { handle: op.handle });
        }
        self.notice =
            Some(Notice::info(format!("Cancelled {} stale operation(s)", cancelled.len())));
        actions.push(AppAction::Render);
        actions
    }

    fn tick(&mut self, now: Timestamp) -> Vec<AppAction> {
        self.now = self.now.max(now);

        if self.session.is_expired(self.now) {
            return self.expire();
        }

        let mut actions = Vec::new();
        if self.poll_due() {
            actions.extend(self.fetch_history(self.conversation.clone()).map(AppAction::Dispatch));
        }
        // Keep progress and stale markers fresh
        if !actions.is_empty() || self.dispatcher.pending_ops().next().is_some() {
            actions.push(AppAction::Render);
        }
        actions
    }

    fn poll_due(&self) -> bool {
        self.session.is_authenticated()
            && self.view.view() != View::Login
            && !self.config.poll_interval.is_zero()
            && !self.dispatcher.is_pending(CommandKind::FetchHistory)
            && self
                .last_poll
                .is_none_or(|at| self.now.saturating_since(at) >= self.config.poll_interval)
    }

    fn resize(&mut self, cols: u16, rows: u16) {
        self.terminal_size = (cols, rows);
        let visible = self.visible_count();
        for timeline in self.timelines.values_mut() {
            timeline.set_visible_count(visible);
        }
    }

    fn resume(&mut self, identity: Identity, expires_at: Option<Timestamp>) -> Vec<AppAction> {
        if expires_at.is_some_and(|at| at <= self.now) {
            tracing::debug!("ignoring expired identity");
            return vec![];
        }
        let username = identity.user.username.clone();
        let Some(actions) = self.start_session(identity.token, identity.user, expires_at) else {
            return vec![];
        };
        tracing::info!(%username, "session resumed");
        self.notice = Some(Notice::info(format!("Welcome back, {username}")));
        actions
    }

    /// Enter Chat with a fresh session and load the current conversation.
    ///
    /// `None` if a session is already active or the view cannot take a
    /// login.
    fn start_session(
        &mut self,
        token: AccessToken,
        user: User,
        expires_at: Option<Timestamp>,
    ) -> Option<Vec<AppAction>> {
        if self.session.is_authenticated() || !self.view.apply(Transition::LoginSucceeded) {
            return None;
        }
        tracing::info!(user = %user.username, "session started");
        self.session.establish(token, user, expires_at);
        self.login_error = None;
        self.notice = None;
        self.fields.clear(FieldId::Password);

        let visible = self.visible_count();
        self.timelines.entry(self.conversation.clone()).or_insert_with(|| Timeline::new(visible));

        let mut actions = Vec::new();
        actions.extend(self.fetch_history(self.conversation.clone()).map(AppAction::Dispatch));
        actions.push(AppAction::Render);
        Some(actions)
    }

    /// Dispatch a history fetch from the conversation's poll cursor.
    ///
    /// Background fetches never show a notice; if the slot is busy the next
    /// tick retries.
    fn fetch_history(&mut self, conversation: Conversation) -> Option<Command> {
        let token = self.session.token()?.clone();
        let since = self.cursors.get(&conversation).copied();
        match self.dispatch(Request::FetchHistory { token, conversation, since }) {
            Ok(command) => {
                self.last_poll = Some(self.now);
                Some(command)
            },
            Err(error) => {
                tracing::debug!(%error, "history fetch deferred");
                self.last_poll = None;
                None
            },
        }
    }

    fn dispatch(&mut self, request: Request) -> Result<Command, DispatchError> {
        let command =
            self.dispatcher.dispatch(self.session.is_authenticated(), request, self.now)?;
        if self.connection == ConnectionState::Disconnected {
            self.connection = ConnectionState::Connecting;
        }
        Ok(command)
    }

    /// Surface a refused user request. Never silent.
    fn reject(&mut self, error: DispatchError) {
        tracing::debug!(%error, "dispatch rejected");
        self.notice = Some(match error {
            DispatchError::OperationInProgress(_) => Notice::wait(error.to_string()),
            DispatchError::AlreadyAuthenticated
            | DispatchError::NotAuthenticated
            | DispatchError::EmptyMessage => Notice::error(error.to_string()),
        });
    }

    fn operation_failed(
        &mut self,
        handle: OpHandle,
        kind: CommandKind,
        error: ErrorKind,
        detail: &str,
    ) -> Vec<AppAction> {
        if !self.dispatcher.complete(kind, handle) {
            return vec![];
        }
        tracing::warn!(%handle, ?kind, %error, detail, "command failed");

        self.connection = if error == ErrorKind::Network {
            ConnectionState::Disconnected
        } else {
            ConnectionState::Connected
        };

        if error == ErrorKind::Unauthorized && self.session.is_authenticated() {
            if kind == CommandKind::SendMessage {
                self.restore_echo(handle);
            }
            return self.expire();
        }

        let message = format!("{error}: {detail}");
        match kind {
            CommandKind::Login if error == ErrorKind::Unauthorized => {
                self.login_error = Some(message);
                self.view.apply(Transition::LoginFailed);
            },
            CommandKind::SendMessage => {
                self.restore_echo(handle);
                self.notice = Some(Notice::error(format!("Message not sent ({message})")));
            },
            CommandKind::Login | CommandKind::FetchHistory | CommandKind::FetchChannels => {
                self.notice = Some(Notice::error(message));
            },
        }
        vec![AppAction::Render]
    }

    /// Drop the echo of `handle` and put its body back into an empty
    /// compose field.
    fn restore_echo(&mut self, handle: OpHandle) {
        let Some(echo) = self.echo.take_if(|echo| echo.handle == handle) else {
            return;
        };
        if self.fields.get(FieldId::Message).is_empty() {
            self.fields.set_value(FieldId::Message, &echo.body);
        }
    }

    fn advance_cursor(&mut self, conversation: &Conversation, messages: &[Message]) {
        let Some(newest) = messages.iter().map(|m| m.sent_at).max() else {
            return;
        };
        let cursor = self.cursors.entry(conversation.clone()).or_insert(newest);
        *cursor = (*cursor).max(newest);
    }

    fn insert_messages(
        &mut self,
        conversation: Conversation,
        messages: impl IntoIterator<Item = Message>,
    ) -> usize {
        let visible = self.visible_count();
        let timeline =
            self.timelines.entry(conversation.clone()).or_insert_with(|| Timeline::new(visible));
        let inserted = timeline.merge(messages);
        if inserted > 0 && conversation != self.conversation {
            self.unread.insert(conversation);
        }
        inserted
    }

    fn scroll(&mut self, delta: isize) -> Vec<AppAction> {
        let visible = self.visible_count();
        self.timelines
            .entry(self.conversation.clone())
            .or_insert_with(|| Timeline::new(visible))
            .scroll_by(delta);
        vec![AppAction::Render]
    }

    fn page(&self) -> isize {
        self.visible_count() as isize
    }

    fn move_selection(&mut self, down: bool) -> Vec<AppAction> {
        self.selected =
            if down { self.selected.saturating_add(1) } else { self.selected.saturating_sub(1) };
        self.clamp_selection();
        vec![AppAction::Render]
    }

    fn clamp_selection(&mut self) {
        let len = self.filtered_channels().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tchat_core::{MessageId, UserId};

    use super::*;

    const T0: Timestamp = Timestamp::from_millis(1_700_000_000_000);

    fn user() -> User {
        User { id: UserId::from("u-1"), username: "demo".into(), email: "demo@example.com".into() }
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle(AppEvent::Key(KeyInput::Char(ch)));
        }
    }

    fn dispatched(actions: &[AppAction]) -> Vec<&Command> {
        actions
            .iter()
            .filter_map(|a| match a {
                AppAction::Dispatch(command) => Some(command),
                _ => None,
            })
            .collect()
    }

    fn handle_of(actions: &[AppAction], kind: CommandKind) -> OpHandle {
        let found = dispatched(actions).into_iter().find(|c| c.request.kind() == kind);
        match found {
            Some(command) => command.handle,
            None => panic!("no {kind:?} dispatched in {actions:?}"),
        }
    }

    fn message(id: &str, body: &str, sent_at: u64) -> Message {
        Message {
            id: MessageId::from(id),
            body: body.into(),
            author_id: UserId::from("u-1"),
            author_name: Some("demo".into()),
            conversation: default_conversation(),
            sent_at: Timestamp::from_millis(sent_at),
        }
    }

    /// App logged in through the real login flow; history fetch completed.
    fn logged_in() -> App {
        let mut app = App::new(AppConfig::default(), T0);
        type_text(&mut app, "demo");
        app.handle(AppEvent::Key(KeyInput::Tab));
        type_text(&mut app, "demo");
        let actions = app.handle(AppEvent::Key(KeyInput::Enter));
        let handle = handle_of(&actions, CommandKind::Login);

        let actions = app.handle(AppEvent::LoginSucceeded {
            handle,
            token: AccessToken::new("token"),
            user: user(),
            expires_at: None,
        });
        let fetch = handle_of(&actions, CommandKind::FetchHistory);
        app.handle(AppEvent::HistoryFetched {
            handle: fetch,
            conversation: default_conversation(),
            messages: vec![],
        });
        app
    }

    #[test]
    fn initial_state_is_login_with_username_focus() {
        let app = App::new(AppConfig::default(), T0);
        assert_eq!(app.view(), View::Login);
        assert_eq!(app.focus(), Focus::UsernameInput);
        assert!(!app.session().is_authenticated());
        assert_eq!(app.connection_state(), ConnectionState::Disconnected);
    }

    #[test]
    fn login_success_enters_chat_and_persists_identity() {
        let mut app = App::new(AppConfig::default(), T0);
        type_text(&mut app, "demo");
        app.handle(AppEvent::Key(KeyInput::Tab));
        type_text(&mut app, "demo");
        let actions = app.handle(AppEvent::Key(KeyInput::Enter));
        let handle = handle_of(&actions, CommandKind::Login);

        let actions = app.handle(AppEvent::LoginSucceeded {
            handle,
            token: AccessToken::new("token"),
            user: user(),
            expires_at: None,
        });

        assert_eq!(app.view(), View::Chat);
        assert_eq!(app.focus(), Focus::MessageInput);
        assert!(app.session().is_authenticated());
        assert!(matches!(actions.first(), Some(AppAction::PersistIdentity(_))));
        assert_eq!(dispatched(&actions).len(), 1);
        assert!(app.fields().get(FieldId::Password).is_empty());
    }

    #[test]
    fn login_failure_stays_on_login_with_error() {
        let mut app = App::new(AppConfig::default(), T0);
        type_text(&mut app, "demo");
        app.handle(AppEvent::Key(KeyInput::Tab));
        type_text(&mut app, "nope");
        let actions = app.handle(AppEvent::Key(KeyInput::Enter));
        let handle = handle_of(&actions, CommandKind::Login);

        app.handle(AppEvent::LoginFailed { handle, reason: "invalid credentials".into() });

        assert_eq!(app.view(), View::Login);
        assert_eq!(app.focus(), Focus::PasswordInput);
        assert_eq!(app.login_error(), Some("invalid credentials"));
        assert!(!app.dispatcher().is_pending(CommandKind::Login));
    }

    #[test]
    fn enter_on_username_moves_to_password() {
        let mut app = App::new(AppConfig::default(), T0);
        type_text(&mut app, "demo");
        let actions = app.handle(AppEvent::Key(KeyInput::Enter));
        assert_eq!(actions, vec![AppAction::Render]);
        assert_eq!(app.focus(), Focus::PasswordInput);
    }

    #[test]
    fn empty_credentials_are_a_validation_error() {
        let mut app = App::new(AppConfig::default(), T0);
        app.handle(AppEvent::Key(KeyInput::Tab));
        type_text(&mut app, "pw");
        let actions = app.handle(AppEvent::Key(KeyInput::Enter));
        assert!(dispatched(&actions).is_empty());
        assert_eq!(app.login_error(), Some("Username and password are required"));
    }

    #[test]
    fn second_login_while_pending_shows_please_wait() {
        let mut app = App::new(AppConfig::default(), T0);
        type_text(&mut app, "demo");
        app.handle(AppEvent::Key(KeyInput::Tab));
        type_text(&mut app, "demo");
        app.handle(AppEvent::Key(KeyInput::Enter));
        let actions = app.handle(AppEvent::Key(KeyInput::Enter));

        assert!(dispatched(&actions).is_empty());
        assert_eq!(app.notice().map(|n| n.level), Some(crate::NoticeLevel::Wait));
    }

    #[test]
    fn send_clears_compose_and_confirmed_copy_appends_once() {
        let mut app = logged_in();
        type_text(&mut app, "hello");
        let actions = app.handle(AppEvent::Key(KeyInput::Enter));
        let handle = handle_of(&actions, CommandKind::SendMessage);

        assert!(app.fields().get(FieldId::Message).is_empty());
        assert_eq!(app.echo().map(|e| e.body.as_str()), Some("hello"));

        let sent = message("42", "hello", T0.as_millis());
        app.handle(AppEvent::MessageSent { handle, message: sent.clone() });
        assert!(app.echo().is_none());

        // A poll returning the same message must not duplicate it
        app.insert_messages(default_conversation(), [sent]);
        let timeline = app.timeline().map(|t| t.messages().to_vec()).unwrap_or_default();
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.first().map(|m| m.id.as_str()), Some("42"));
    }

    #[test]
    fn whitespace_message_is_rejected_without_dispatch() {
        let mut app = logged_in();
        type_text(&mut app, "   ");
        let actions = app.handle(AppEvent::Key(KeyInput::Enter));

        assert!(dispatched(&actions).is_empty());
        assert_eq!(app.fields().value(FieldId::Message), "   ");
        assert_eq!(
            app.notice().map(|n| n.text.as_str()),
            Some("cannot send an empty message")
        );
    }

    #[test]
    fn failed_send_restores_body() {
        let mut app = logged_in();
        type_text(&mut app, "hello");
        let actions = app.handle(AppEvent::Key(KeyInput::Enter));
        let handle = handle_of(&actions, CommandKind::SendMessage);

        app.handle(AppEvent::OperationFailed {
            handle,
            kind: CommandKind::SendMessage,
            error: ErrorKind::Network,
            detail: "connection refused".into(),
        });

        assert_eq!(app.fields().value(FieldId::Message), "hello");
        assert!(app.echo().is_none());
        assert_eq!(app.connection_state(), ConnectionState::Disconnected);
        assert!(app.notice().is_some_and(|n| n.text.contains("connection refused")));
        assert_eq!(app.view(), View::Chat);
    }

    #[test]
    fn unauthorized_result_expires_session() {
        let mut app = logged_in();
        type_text(&mut app, "hello");
        let actions = app.handle(AppEvent::Key(KeyInput::Enter));
        let handle = handle_of(&actions, CommandKind::SendMessage);

        let actions = app.handle(AppEvent::OperationFailed {
            handle,
            kind: CommandKind::SendMessage,
            error: ErrorKind::Unauthorized,
            detail: "unauthorized".into(),
        });

        assert_eq!(app.view(), View::Login);
        assert!(!app.session().is_authenticated());
        assert!(actions.contains(&AppAction::ClearIdentity));
        assert_eq!(app.login_error(), Some("session expired, please log in again"));
        assert!(app.echo().is_none());
        assert_eq!(app.fields().value(FieldId::Message), "hello");

        // Logging back in finds the draft in the compose field
        app.handle(AppEvent::Key(KeyInput::Tab));
        type_text(&mut app, "demo");
        let actions = app.handle(AppEvent::Key(KeyInput::Enter));
        let handle = handle_of(&actions, CommandKind::Login);
        app.handle(AppEvent::LoginSucceeded {
            handle,
            token: AccessToken::new("fresh"),
            user: user(),
            expires_at: None,
        });
        assert_eq!(app.view(), View::Chat);
        assert_eq!(app.fields().value(FieldId::Message), "hello");
    }

    #[test]
    fn history_for_other_conversation_marks_unread() {
        let mut app = logged_in();
        let random = Conversation::Channel(ChannelId::from("random"));
        app.insert_messages(random.clone(), [message("7", "hi", 1)]);

        assert!(app.unread().contains(&random));
        assert!(!app.unread().contains(&default_conversation()));
    }

    #[test]
    fn late_result_after_cancel_is_ignored() {
        let mut app = logged_in();
        type_text(&mut app, "hello");
        let actions = app.handle(AppEvent::Key(KeyInput::Enter));
        let handle = handle_of(&actions, CommandKind::SendMessage);

        app.handle(AppEvent::Tick { now: T0.saturating_add(Duration::from_secs(20)) });
        assert_eq!(app.stale_ops().len(), 1);

        let actions = app.handle(AppEvent::Key(KeyInput::Ctrl('x')));
        assert!(actions.contains(&AppAction::Cancel { handle }));
        assert_eq!(app.fields().value(FieldId::Message), "hello");

        let late = app.handle(AppEvent::MessageSent {
            handle,
            message: message("42", "hello", T0.as_millis()),
        });
        assert!(late.is_empty());
        assert!(app.timeline().is_some_and(Timeline::is_empty));
    }

    fn polled_since(actions: &[AppAction]) -> Option<Option<Timestamp>> {
        dispatched(actions).into_iter().find_map(|c| match &c.request {
            Request::FetchHistory { since, .. } => Some(*since),
            _ => None,
        })
    }

    #[test]
    fn polling_cursor_follows_fetched_history_only() {
        let mut app = logged_in();

        let actions = app.handle(AppEvent::Tick { now: T0.saturating_add(Duration::from_secs(1)) });
        assert!(dispatched(&actions).is_empty());

        // Nothing fetched yet: poll everything
        let actions = app.handle(AppEvent::Tick { now: T0.saturating_add(Duration::from_secs(6)) });
        assert_eq!(polled_since(&actions), Some(None));
        let fetch = handle_of(&actions, CommandKind::FetchHistory);
        app.handle(AppEvent::HistoryFetched {
            handle: fetch,
            conversation: default_conversation(),
            messages: vec![message("2", "b", 700), message("1", "a", 500)],
        });

        // A confirmed send with a later timestamp leaves the cursor alone
        type_text(&mut app, "mine");
        let actions = app.handle(AppEvent::Key(KeyInput::Enter));
        let send = handle_of(&actions, CommandKind::SendMessage);
        app.handle(AppEvent::MessageSent { handle: send, message: message("9", "mine", 9_000) });

        let actions =
            app.handle(AppEvent::Tick { now: T0.saturating_add(Duration::from_secs(12)) });
        assert_eq!(polled_since(&actions), Some(Some(Timestamp::from_millis(700))));
    }

    #[test]
    fn history_fetch_orders_out_of_order_batch_with_ties() {
        let mut app = logged_in();
        let actions = app.handle(AppEvent::Tick { now: T0.saturating_add(Duration::from_secs(6)) });
        let fetch = handle_of(&actions, CommandKind::FetchHistory);

        app.handle(AppEvent::HistoryFetched {
            handle: fetch,
            conversation: default_conversation(),
            messages: vec![message("1", "c", 300), message("2", "a", 100), message("3", "b", 300)],
        });

        let ids: Vec<_> = app
            .timeline()
            .map(|t| t.messages().iter().map(|m| m.id.as_str().to_owned()).collect())
            .unwrap_or_default();
        assert_eq!(ids, ["2", "1", "3"]);
        assert!(app.unread().is_empty());
    }

    #[test]
    fn token_expiry_on_tick_returns_to_login() {
        let mut app = App::new(AppConfig::default(), T0);
        let identity = Identity { user: user(), token: AccessToken::new("token") };
        app.handle(AppEvent::SessionResumed {
            identity,
            expires_at: Some(T0.saturating_add(Duration::from_secs(60))),
        });
        assert_eq!(app.view(), View::Chat);

        let actions =
            app.handle(AppEvent::Tick { now: T0.saturating_add(Duration::from_secs(60)) });
        assert_eq!(app.view(), View::Login);
        assert_eq!(app.focus(), Focus::UsernameInput);
        assert!(actions.contains(&AppAction::ClearIdentity));
        assert!(actions.iter().any(|a| matches!(a, AppAction::Cancel { .. })));
    }

    #[test]
    fn channel_list_round_trip_selects_channel() {
        let mut app = logged_in();
        let actions = app.handle(AppEvent::Key(KeyInput::Ctrl('l')));
        assert_eq!(app.view(), View::ChannelList);
        assert_eq!(app.focus(), Focus::ChannelSearchInput);
        let handle = handle_of(&actions, CommandKind::FetchChannels);

        let channel = |id: &str| Channel {
            id: ChannelId::from(id),
            name: id.into(),
            description: String::new(),
            members: vec![],
        };
        app.handle(AppEvent::ChannelsFetched {
            handle,
            channels: vec![channel("general"), channel("random"), channel("rust")],
        });

        type_text(&mut app, "r");
        assert_eq!(app.filtered_channels().len(), 3);
        type_text(&mut app, "u");
        assert_eq!(app.filtered_channels().len(), 1);

        let actions = app.handle(AppEvent::Key(KeyInput::Enter));
        assert_eq!(app.view(), View::Chat);
        assert_eq!(app.conversation(), &Conversation::Channel(ChannelId::from("rust")));
        assert_eq!(dispatched(&actions).len(), 1);
    }

    #[test]
    fn esc_leaves_channel_list_without_switching() {
        let mut app = logged_in();
        app.handle(AppEvent::Key(KeyInput::Ctrl('l')));
        app.handle(AppEvent::Key(KeyInput::Esc));
        assert_eq!(app.view(), View::Chat);
        assert_eq!(app.conversation(), &default_conversation());
    }

    #[test]
    fn settings_logout_clears_session() {
        let mut app = logged_in();
        app.handle(AppEvent::Key(KeyInput::Ctrl('o')));
        assert_eq!(app.view(), View::Settings);
        assert_eq!(app.focus(), Focus::None);

        let actions = app.handle(AppEvent::Key(KeyInput::Char('l')));
        assert_eq!(app.view(), View::Login);
        assert!(!app.session().is_authenticated());
        assert!(actions.contains(&AppAction::ClearIdentity));
        assert!(app.timelines().is_empty());
        assert_eq!(app.fields().value(FieldId::Username), "demo");
    }

    #[test]
    fn illegal_focus_is_rejected_and_unchanged() {
        let mut app = App::new(AppConfig::default(), T0);
        let result = app.set_focus(Focus::MessageInput);
        assert_eq!(result, Err(FocusError { target: Focus::MessageInput, view: View::Login }));
        assert_eq!(app.focus(), Focus::UsernameInput);
    }

    #[test]
    fn illegal_transition_keys_are_inert() {
        let mut app = App::new(AppConfig::default(), T0);
        assert!(app.handle(AppEvent::Key(KeyInput::Ctrl('l'))).is_empty());
        assert!(app.handle(AppEvent::Key(KeyInput::Ctrl('o'))).is_empty());
        assert_eq!(app.view(), View::Login);
    }

    #[test]
    fn quit_is_terminal() {
        let mut app = logged_in();
        type_text(&mut app, "hello");
        let send = app.handle(AppEvent::Key(KeyInput::Enter));
        let handle = handle_of(&send, CommandKind::SendMessage);

        let actions = app.handle(AppEvent::Key(KeyInput::Ctrl('c')));
        assert_eq!(actions, vec![AppAction::Cancel { handle }, AppAction::Quit]);
        assert!(app.is_terminated());

        assert!(app.handle(AppEvent::Key(KeyInput::Char('a'))).is_empty());
        assert!(
            app.handle(AppEvent::MessageSent {
                handle,
                message: message("42", "hello", T0.as_millis())
            })
            .is_empty()
        );
    }

    #[test]
    fn resize_updates_visible_count() {
        let mut app = logged_in();
        app.handle(AppEvent::Resize(100, 16));
        assert_eq!(app.visible_count(), 10);
        assert_eq!(app.timeline().map(Timeline::visible_count), Some(10));
    }

    #[test]
    fn dm_command_switches_conversation() {
        let mut app = logged_in();
        type_text(&mut app, "/dm @alice");
        let actions = app.handle(AppEvent::Key(KeyInput::Enter));
        assert_eq!(app.conversation(), &Conversation::Direct("alice".into()));
        assert!(app.fields().get(FieldId::Message).is_empty());
        assert_eq!(dispatched(&actions).len(), 1);
    }
}
