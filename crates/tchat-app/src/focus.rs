//! Focus routing.
//!
//! Exactly one target receives keystrokes at a time. Each [`View`] has a
//! fixed legal set of targets; focus outside that set is never stored.

use thiserror::Error;

use crate::{FieldId, View};

/// What currently receives keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Focus {
    /// Nothing editable (key bindings only).
    None,
    /// Username field of the login view.
    UsernameInput,
    /// Password field of the login view.
    PasswordInput,
    /// Compose field of the chat view.
    MessageInput,
    /// Search field of the channel list view.
    ChannelSearchInput,
    /// Channel list selection.
    ChannelList,
}

impl Focus {
    /// Field edited while this target has focus. `None` for lists.
    pub fn field(self) -> Option<FieldId> {
        match self {
            Self::UsernameInput => Some(FieldId::Username),
            Self::PasswordInput => Some(FieldId::Password),
            Self::MessageInput => Some(FieldId::Message),
            Self::ChannelSearchInput => Some(FieldId::ChannelSearch),
            Self::None | Self::ChannelList => None,
        }
    }
}

/// Focus was requested for a target that does not exist in the active view.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid focus target {target:?} for view {view:?}")]
pub struct FocusError {
    /// Requested target.
    pub target: Focus,
    /// View that was active.
    pub view: View,
}

/// Targets that may hold focus in `view`, in Tab order.
pub fn legal_targets(view: View) -> &'static [Focus] {
    match view {
        View::Login => &[Focus::UsernameInput, Focus::PasswordInput],
        View::Chat => &[Focus::MessageInput],
        View::ChannelList => &[Focus::ChannelSearchInput, Focus::ChannelList],
        View::Settings => &[Focus::None],
    }
}

/// Default focus on entering `view`.
pub fn focus_of(view: View) -> Focus {
    legal_targets(view).first().copied().unwrap_or(Focus::None)
}

/// Next target in Tab order, wrapping. Unchanged in single-target views.
pub fn advance(view: View, current: Focus) -> Focus {
    let targets = legal_targets(view);
    let Some(idx) = targets.iter().position(|&t| t == current) else {
        return focus_of(view);
    };
    let next = if idx + 1 >= targets.len() { 0 } else { idx + 1 };
    targets.get(next).copied().unwrap_or(current)
}

/// True if `target` may hold focus in `view`.
pub fn is_legal(view: View, target: Focus) -> bool {
    legal_targets(view).contains(&target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_cycles_login_fields() {
        let next = advance(View::Login, Focus::UsernameInput);
        assert_eq!(next, Focus::PasswordInput);
        assert_eq!(advance(View::Login, next), Focus::UsernameInput);
    }

    #[test]
    fn advance_is_noop_in_single_target_views() {
        assert_eq!(advance(View::Chat, Focus::MessageInput), Focus::MessageInput);
        assert_eq!(advance(View::Settings, Focus::None), Focus::None);
    }

    #[test]
    fn default_focus_is_legal_everywhere() {
        for view in [View::Login, View::Chat, View::ChannelList, View::Settings] {
            assert!(is_legal(view, focus_of(view)));
        }
    }

    #[test]
    fn message_input_is_illegal_on_login() {
        assert!(!is_legal(View::Login, Focus::MessageInput));
    }
}
