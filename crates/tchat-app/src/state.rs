//! Observable session state types.
//!
//! These structures are the view model: the subset of account and network
//! state the UI needs, owned exclusively by the [`crate::App`] reducer.

use std::time::Duration;

use tchat_core::{AccessToken, Conversation, Identity, Timestamp, User};

use crate::OpHandle;

/// Authentication state.
///
/// Token and user are set together by a successful login (or resume) and
/// cleared together on logout or expiry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<AccessToken>,
    user: Option<User>,
    expires_at: Option<Timestamp>,
}

impl Session {
    /// An empty, unauthenticated session.
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a token is held.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Current token. `None` if not authenticated.
    pub fn token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    /// Current user. `None` if not authenticated.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Token expiry, if the token carried one.
    pub fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }

    /// True if authenticated with a token that expired at or before `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.is_authenticated() && self.expires_at.is_some_and(|at| at <= now)
    }

    /// Identity to persist for resuming later.
    pub fn identity(&self) -> Option<Identity> {
        match (&self.token, &self.user) {
            (Some(token), Some(user)) => {
                Some(Identity { user: user.clone(), token: token.clone() })
            },
            _ => None,
        }
    }

    pub(crate) fn establish(
        &mut self,
        token: AccessToken,
        user: User,
        expires_at: Option<Timestamp>,
    ) {
        self.token = Some(token);
        self.user = Some(user);
        self.expires_at = expires_at;
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Reachability of the server as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No successful exchange yet, or the last one failed at network level.
    Disconnected,
    /// A command is in flight and nothing has come back yet.
    Connecting,
    /// The server answered the last command.
    Connected,
}

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// Request refused until a pending op finishes.
    Wait,
    /// Something failed.
    Error,
}

/// Transient banner shown at the bottom of the active view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Text to show.
    pub text: String,
}

impl Notice {
    /// Informational notice.
    pub fn info(text: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, text: text.into() }
    }

    /// "Please wait" notice.
    pub fn wait(text: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Wait, text: text.into() }
    }

    /// Error notice.
    pub fn error(text: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, text: text.into() }
    }
}

/// Provisional local display of a message being sent.
///
/// Lives outside the timeline, which is append-only; dropped once the
/// server copy arrives or the send fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Echo {
    /// Send command this echo belongs to.
    pub handle: OpHandle,
    /// Destination conversation.
    pub conversation: Conversation,
    /// Body as typed.
    pub body: String,
}

/// Tunables of the session reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppConfig {
    /// How often to poll the current conversation for new messages.
    /// `Duration::ZERO` disables polling.
    pub poll_interval: Duration,
    /// After how long a pending op is shown as stale and may be cancelled.
    pub stale_after: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { poll_interval: Duration::from_secs(5), stale_after: Duration::from_secs(15) }
    }
}
