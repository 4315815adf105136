//! Ordered message history with a scroll window.
//!
//! # Invariants
//!
//! - Messages are sorted by `sent_at`, ties in arrival order.
//! - Message ids are unique; appending a known id is a no-op.
//! - Nothing is ever removed or edited.
//! - `offset <= len - visible_count` (saturating).
//!
//! A timeline scrolled to the bottom stays pinned there as messages arrive.

use std::collections::HashSet;

use tchat_core::{Message, MessageId};

/// Append-only message sequence plus viewport.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    messages: Vec<Message>,
    ids: HashSet<MessageId>,
    /// Index of the first visible message.
    offset: usize,
    visible_count: usize,
}

impl Timeline {
    /// Create an empty timeline showing `visible_count` messages at a time.
    pub fn new(visible_count: usize) -> Self {
        Self { messages: Vec::new(), ids: HashSet::new(), offset: 0, visible_count }
    }

    /// Insert a message preserving order. Returns `false` if the id is
    /// already present.
    pub fn append(&mut self, message: Message) -> bool {
        if self.ids.contains(&message.id) {
            return false;
        }

        let pinned = self.offset >= self.max_offset();
        let at = self.messages.partition_point(|m| m.sent_at <= message.sent_at);

        self.ids.insert(message.id.clone());
        self.messages.insert(at, message);

        if pinned {
            self.offset = self.max_offset();
        } else if at < self.offset {
            // Keep the same messages on screen when history lands above them
            self.offset += 1;
        }
        self.clamp();
        true
    }

    /// Append every message not already present. Returns how many were
    /// inserted.
    pub fn merge(&mut self, messages: impl IntoIterator<Item = Message>) -> usize {
        let mut inserted = 0;
        for message in messages {
            if self.append(message) {
                inserted += 1;
            }
        }
        inserted
    }

    /// Up to `count` messages starting at `offset`, clamped to bounds.
    pub fn window(&self, offset: usize, count: usize) -> &[Message] {
        let start = offset.min(self.messages.len());
        let end = start.saturating_add(count).min(self.messages.len());
        self.messages.get(start..end).unwrap_or_default()
    }

    /// Messages inside the current viewport.
    pub fn visible(&self) -> &[Message] {
        self.window(self.offset, self.visible_count)
    }

    /// Move the viewport by `delta` messages (negative scrolls up).
    pub fn scroll_by(&mut self, delta: isize) {
        self.offset = if delta.is_negative() {
            self.offset.saturating_sub(delta.unsigned_abs())
        } else {
            self.offset.saturating_add(delta.unsigned_abs())
        };
        self.clamp();
    }

    /// Resize the viewport. Re-clamps the offset, keeping a pinned view
    /// pinned.
    pub fn set_visible_count(&mut self, visible_count: usize) {
        let pinned = self.offset >= self.max_offset();
        self.visible_count = visible_count;
        if pinned {
            self.offset = self.max_offset();
        }
        self.clamp();
    }

    /// All messages in order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// True if a message with `id` is present.
    pub fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True if there are no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Current viewport offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Viewport height in messages.
    pub fn visible_count(&self) -> usize {
        self.visible_count
    }

    /// Largest legal offset.
    pub fn max_offset(&self) -> usize {
        self.messages.len().saturating_sub(self.visible_count)
    }

    fn clamp(&mut self) {
        self.offset = self.offset.min(self.max_offset());
    }
}
