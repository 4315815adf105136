//! Session input events.
//!
//! This module defines [`AppEvent`], the complete set of inputs that drive
//! the [`crate::App`] reducer.
//!
//! Events originate from two sources:
//! - User interaction (keyboard, resize), clock ticks and the quit signal.
//! - Results of background commands, each tagged with its [`OpHandle`].

use tchat_core::{
    AccessToken, Channel, Conversation, ErrorKind, Identity, Message, Timestamp, User,
};

use crate::{CommandKind, KeyInput, OpHandle};

/// Events processed by the App reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Keyboard input.
    Key(KeyInput),

    /// Periodic tick carrying the current time.
    Tick {
        /// Current wall-clock time.
        now: Timestamp,
    },

    /// Terminal resize (columns, rows).
    Resize(u16, u16),

    /// Quit signal from the host.
    Quit,

    /// A stored, unexpired identity was found at startup.
    SessionResumed {
        /// Stored identity.
        identity: Identity,
        /// Token expiry from the token claims.
        expires_at: Option<Timestamp>,
    },

    /// Login command succeeded.
    LoginSucceeded {
        /// Handle of the login command.
        handle: OpHandle,
        /// Issued token.
        token: AccessToken,
        /// Authenticated account.
        user: User,
        /// Token expiry from the token claims.
        expires_at: Option<Timestamp>,
    },

    /// Login command was rejected by the auth service.
    LoginFailed {
        /// Handle of the login command.
        handle: OpHandle,
        /// Human-readable reason.
        reason: String,
    },

    /// Send command succeeded; server-confirmed copy.
    MessageSent {
        /// Handle of the send command.
        handle: OpHandle,
        /// Message as stored by the server.
        message: Message,
    },

    /// History fetch succeeded.
    HistoryFetched {
        /// Handle of the fetch command.
        handle: OpHandle,
        /// Conversation fetched.
        conversation: Conversation,
        /// Messages in arbitrary order.
        messages: Vec<Message>,
    },

    /// Channel list fetch succeeded.
    ChannelsFetched {
        /// Handle of the fetch command.
        handle: OpHandle,
        /// Visible channels.
        channels: Vec<Channel>,
    },

    /// A command failed at transport level.
    OperationFailed {
        /// Handle of the failed command.
        handle: OpHandle,
        /// Kind of the failed command.
        kind: CommandKind,
        /// Failure classification.
        error: ErrorKind,
        /// Human-readable detail.
        detail: String,
    },
}

impl AppEvent {
    /// Handle of the command this event completes. `None` for input events.
    pub fn handle(&self) -> Option<OpHandle> {
        match self {
            Self::LoginSucceeded { handle, .. }
            | Self::LoginFailed { handle, .. }
            | Self::MessageSent { handle, .. }
            | Self::HistoryFetched { handle, .. }
            | Self::ChannelsFetched { handle, .. }
            | Self::OperationFailed { handle, .. } => Some(*handle),
            Self::Key(_)
            | Self::Tick { .. }
            | Self::Resize(..)
            | Self::Quit
            | Self::SessionResumed { .. } => None,
        }
    }
}
