//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of a session at a point in time.
//! Invariants operate on snapshots rather than live state to ensure
//! consistent, atomic checks. Snapshots serialize deterministically so they
//! double as snapshot-test fixtures.

use std::fmt;

use serde::{Serialize, Serializer};
use tchat_app::{App, CommandKind, FieldId, Focus, Timeline, View};

/// Snapshot of a session's observable state.
#[derive(Debug, Clone, Serialize)]
pub struct AppSnapshot {
    /// Active view.
    #[serde(serialize_with = "as_debug")]
    pub view: View,
    /// Focused target.
    #[serde(serialize_with = "as_debug")]
    pub focus: Focus,
    /// Quit was processed.
    pub terminated: bool,
    /// A session token is held.
    pub authenticated: bool,
    /// Logged-in username.
    pub username: Option<String>,
    /// Conversation shown in the chat view.
    pub conversation: String,
    /// Every input field.
    pub fields: Vec<FieldSnapshot>,
    /// Every loaded timeline, ordered by conversation.
    pub timelines: Vec<TimelineSnapshot>,
    /// Pending ops as `(kind, handle)`, in slot order.
    pub pending: Vec<(String, u64)>,
    /// Handle of the send the echo belongs to.
    pub echo: Option<u64>,
    /// Entries in the filtered channel list.
    pub filtered_channels: usize,
    /// Selected channel index.
    pub selected_channel: usize,
    /// Conversations with unread messages, sorted.
    pub unread: Vec<String>,
}

/// Snapshot of one input field.
#[derive(Debug, Clone, Serialize)]
pub struct FieldSnapshot {
    /// Field identifier.
    #[serde(serialize_with = "as_debug")]
    pub id: FieldId,
    /// Length in chars.
    pub len: usize,
    /// Cursor position in chars.
    pub cursor: usize,
    /// Length limit.
    pub max_length: usize,
}

/// Snapshot of one timeline.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineSnapshot {
    /// Conversation label (`#general`, `@bob`).
    pub conversation: String,
    /// Message ids in buffer order.
    pub message_ids: Vec<String>,
    /// Message timestamps in buffer order (epoch millis).
    pub timestamps: Vec<u64>,
    /// Scroll offset.
    pub offset: usize,
    /// Largest legal scroll offset.
    pub max_offset: usize,
    /// Messages shown at once.
    pub visible_count: usize,
}

const FIELDS: [FieldId; 4] =
    [FieldId::Username, FieldId::Password, FieldId::Message, FieldId::ChannelSearch];

impl AppSnapshot {
    /// Extract a snapshot from `app`.
    pub fn from_app(app: &App) -> Self {
        let fields = FIELDS
            .iter()
            .map(|&id| {
                let field = app.fields().get(id);
                FieldSnapshot {
                    id,
                    len: field.len(),
                    cursor: field.cursor(),
                    max_length: field.max_length(),
                }
            })
            .collect();

        let mut timelines: Vec<_> = app
            .timelines()
            .iter()
            .map(|(conversation, timeline)| {
                TimelineSnapshot::new(conversation.to_string(), timeline)
            })
            .collect();
        timelines.sort_by(|a, b| a.conversation.cmp(&b.conversation));

        let pending = app
            .dispatcher()
            .pending_ops()
            .map(|op| (kind_name(op.kind).to_string(), op.handle.get()))
            .collect();

        let mut unread: Vec<_> = app.unread().iter().map(ToString::to_string).collect();
        unread.sort();

        Self {
            view: app.view(),
            focus: app.focus(),
            terminated: app.is_terminated(),
            authenticated: app.session().is_authenticated(),
            username: app.session().user().map(|u| u.username.clone()),
            conversation: app.conversation().to_string(),
            fields,
            timelines,
            pending,
            echo: app.echo().map(|echo| echo.handle.get()),
            filtered_channels: app.filtered_channels().len(),
            selected_channel: app.selected_channel(),
            unread,
        }
    }

    /// Handle of the pending op of `kind`.
    pub fn pending_handle(&self, kind: CommandKind) -> Option<u64> {
        let name = kind_name(kind);
        self.pending.iter().find(|(k, _)| k == name).map(|&(_, handle)| handle)
    }
}

impl TimelineSnapshot {
    fn new(conversation: String, timeline: &Timeline) -> Self {
        Self {
            conversation,
            message_ids: timeline.messages().iter().map(|m| m.id.to_string()).collect(),
            timestamps: timeline.messages().iter().map(|m| m.sent_at.as_millis()).collect(),
            offset: timeline.offset(),
            max_offset: timeline.max_offset(),
            visible_count: timeline.visible_count(),
        }
    }
}

fn kind_name(kind: CommandKind) -> &'static str {
    match kind {
        CommandKind::Login => "Login",
        CommandKind::SendMessage => "SendMessage",
        CommandKind::FetchHistory => "FetchHistory",
        CommandKind::FetchChannels => "FetchChannels",
    }
}

fn as_debug<T: fmt::Debug, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("{value:?}"))
}
