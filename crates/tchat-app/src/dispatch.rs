//! Async command bookkeeping.
//!
//! The [`Dispatcher`] decides whether a network command may start and
//! tracks at most one [`PendingOp`] per [`CommandKind`]. It never performs
//! I/O: an accepted request becomes a [`Command`] that the runtime hands to
//! a background worker (see [`crate::CommandRunner`]). The worker's outcome
//! comes back through the event stream carrying the same [`OpHandle`], and
//! [`Dispatcher::complete`] clears the slot exactly once.
//!
//! A second request of a kind that is already pending is rejected with
//! [`DispatchError::OperationInProgress`] rather than queued.

use std::{collections::BTreeMap, time::Duration};

use tchat_core::{AccessToken, Conversation, Timestamp, UserId};
use thiserror::Error;

/// Kinds of network commands. One pending slot each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandKind {
    /// Exchange credentials for a session.
    Login,
    /// Submit the compose line.
    SendMessage,
    /// Fetch conversation history.
    FetchHistory,
    /// Fetch the channel list.
    FetchChannels,
}

impl CommandKind {
    /// Progress label shown while pending.
    pub fn progress_label(self) -> &'static str {
        match self {
            Self::Login => "Logging in...",
            Self::SendMessage => "Sending...",
            Self::FetchHistory => "Loading messages...",
            Self::FetchChannels => "Loading channels...",
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Login => "login",
            Self::SendMessage => "send",
            Self::FetchHistory => "history fetch",
            Self::FetchChannels => "channel fetch",
        };
        f.write_str(name)
    }
}

/// Identifies one dispatched command. Unique per session, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpHandle(u64);

impl OpHandle {
    /// Raw handle value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for OpHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// Payload of a command. Owns copies of everything the worker needs; no
/// session state is aliased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Log in with credentials.
    Login {
        /// Username.
        username: String,
        /// Plaintext password.
        password: String,
    },
    /// Send a message.
    SendMessage {
        /// Session token.
        token: AccessToken,
        /// Sending user.
        sender: UserId,
        /// Destination conversation.
        conversation: Conversation,
        /// Message body.
        body: String,
    },
    /// Fetch history sent at or after `since`.
    FetchHistory {
        /// Session token.
        token: AccessToken,
        /// Conversation to fetch.
        conversation: Conversation,
        /// Cursor: newest timestamp a previous fetch returned.
        since: Option<Timestamp>,
    },
    /// Fetch the channel list.
    FetchChannels {
        /// Session token.
        token: AccessToken,
    },
}

impl Request {
    /// Slot this request occupies.
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Login { .. } => CommandKind::Login,
            Self::SendMessage { .. } => CommandKind::SendMessage,
            Self::FetchHistory { .. } => CommandKind::FetchHistory,
            Self::FetchChannels { .. } => CommandKind::FetchChannels,
        }
    }
}

/// An accepted request, ready for a background worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Handle the result must carry.
    pub handle: OpHandle,
    /// What to do.
    pub request: Request,
}

/// Bookkeeping for an in-flight command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingOp {
    /// Handle of the in-flight command.
    pub handle: OpHandle,
    /// Kind of the in-flight command.
    pub kind: CommandKind,
    /// When it was dispatched.
    pub started_at: Timestamp,
}

impl PendingOp {
    /// True once the op has been outstanding for at least `stale_after`.
    pub fn is_stale(&self, now: Timestamp, stale_after: Duration) -> bool {
        now.saturating_since(self.started_at) >= stale_after
    }
}

/// Reasons a dispatch is refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// Login requested while a session is active.
    #[error("already logged in")]
    AlreadyAuthenticated,

    /// Session required but nobody is logged in.
    #[error("not logged in")]
    NotAuthenticated,

    /// Compose line is empty or whitespace.
    #[error("cannot send an empty message")]
    EmptyMessage,

    /// A command of this kind is already pending.
    #[error("please wait: {0} already in progress")]
    OperationInProgress(CommandKind),
}

/// Pending-op slots and handle allocation.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    next_handle: u64,
    pending: BTreeMap<CommandKind, PendingOp>,
}

impl Dispatcher {
    /// Create a dispatcher with no pending ops.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a request and claim its slot.
    ///
    /// Validation failures are checked before the slot so an empty message
    /// never reports `OperationInProgress`.
    pub fn dispatch(
        &mut self,
        authenticated: bool,
        request: Request,
        now: Timestamp,
    ) -> Result<Command, DispatchError> {
        match &request {
            Request::Login { .. } if authenticated => {
                return Err(DispatchError::AlreadyAuthenticated);
            },
            Request::SendMessage { body, .. } if body.trim().is_empty() => {
                return Err(DispatchError::EmptyMessage);
            },
            Request::Login { .. } => {},
            Request::SendMessage { .. }
            | Request::FetchHistory { .. }
            | Request::FetchChannels { .. } => {
                if !authenticated {
                    return Err(DispatchError::NotAuthenticated);
                }
            },
        }

        let kind = request.kind();
        if self.pending.contains_key(&kind) {
            return Err(DispatchError::OperationInProgress(kind));
        }

        self.next_handle += 1;
        let handle = OpHandle(self.next_handle);
        self.pending.insert(kind, PendingOp { handle, kind, started_at: now });
        tracing::debug!(%handle, ?kind, "command dispatched");

        Ok(Command { handle, request })
    }

    /// Clear the slot of `kind` if `handle` is the op occupying it.
    ///
    /// Returns `false` for late, duplicate or cancelled results, which the
    /// caller must ignore.
    pub fn complete(&mut self, kind: CommandKind, handle: OpHandle) -> bool {
        match self.pending.get(&kind) {
            Some(op) if op.handle == handle => {
                self.pending.remove(&kind);
                tracing::debug!(%handle, ?kind, "command completed");
                true
            },
            _ => {
                tracing::debug!(%handle, ?kind, "ignoring result of unknown command");
                false
            },
        }
    }

    /// Pending op of `kind`, if any.
    pub fn pending(&self, kind: CommandKind) -> Option<&PendingOp> {
        self.pending.get(&kind)
    }

    /// True if a command of `kind` is in flight.
    pub fn is_pending(&self, kind: CommandKind) -> bool {
        self.pending.contains_key(&kind)
    }

    /// All pending ops in kind order.
    pub fn pending_ops(&self) -> impl Iterator<Item = &PendingOp> {
        self.pending.values()
    }

    /// Pending ops outstanding for at least `stale_after`.
    pub fn stale(&self, now: Timestamp, stale_after: Duration) -> Vec<PendingOp> {
        self.pending.values().filter(|op| op.is_stale(now, stale_after)).copied().collect()
    }

    /// Drop stale ops. Their results will be ignored.
    pub fn cancel_stale(&mut self, now: Timestamp, stale_after: Duration) -> Vec<PendingOp> {
        let stale = self.stale(now, stale_after);
        for op in &stale {
            self.pending.remove(&op.kind);
        }
        stale
    }

    /// Drop every pending op. Their results will be ignored.
    pub fn cancel_all(&mut self) -> Vec<PendingOp> {
        std::mem::take(&mut self.pending).into_values().collect()
    }
}
