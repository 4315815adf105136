//! View state machine.
//!
//! ```text
//!            LoginSucceeded                OpenChannelList
//!   Login ------------------> Chat <-------------------------> ChannelList
//!     ^  \__ LoginFailed       |  ^   SelectChannel / CloseChannelList
//!     |                        |  |
//!     |   Logout  OpenSettings v  | CloseSettings
//!     +------------------- Settings
//!
//!   SessionExpired: Chat | ChannelList | Settings -> Login
//!   Quit: any -> terminated (absorbing)
//! ```
//!
//! Transitions not in the table are ignored: [`ViewState::apply`] returns
//! `false` and leaves the state untouched.

use crate::{
    Focus, FocusError,
    focus::{self, focus_of},
};

/// Full-screen UI modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    /// Credentials entry.
    Login,
    /// Message timeline and compose line.
    Chat,
    /// Channel picker.
    ChannelList,
    /// Account information and logout.
    Settings,
}

/// Triggers for view transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Login result was a success.
    LoginSucceeded,
    /// Login result was a failure. Stays on Login.
    LoginFailed,
    /// User asked for the channel list.
    OpenChannelList,
    /// User picked a channel from the list.
    SelectChannel,
    /// User left the channel list without picking.
    CloseChannelList,
    /// User opened settings.
    OpenSettings,
    /// User left settings.
    CloseSettings,
    /// User logged out.
    Logout,
    /// Session token expired or was rejected.
    SessionExpired,
    /// Quit signal.
    Quit,
}

/// Current view plus focus, with the terminated flag.
///
/// Invariant: `focus` is always legal for `view`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    view: View,
    focus: Focus,
    terminated: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewState {
    /// Initial state: Login with focus on the username field.
    pub fn new() -> Self {
        Self { view: View::Login, focus: focus_of(View::Login), terminated: false }
    }

    /// Active view.
    pub fn view(&self) -> View {
        self.view
    }

    /// Focused target.
    pub fn focus(&self) -> Focus {
        self.focus
    }

    /// True once `Quit` was applied. Terminal.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Move focus to `target` if it is legal for the active view.
    ///
    /// Focus is left unchanged on error.
    pub fn set_focus(&mut self, target: Focus) -> Result<(), FocusError> {
        if !focus::is_legal(self.view, target) {
            return Err(FocusError { target, view: self.view });
        }
        self.focus = target;
        Ok(())
    }

    /// Advance focus in Tab order within the active view.
    pub fn advance_focus(&mut self) {
        self.focus = focus::advance(self.view, self.focus);
    }

    /// Apply a transition. Returns `true` if it was legal.
    ///
    /// Entering a different view resets focus to that view's default.
    pub fn apply(&mut self, transition: Transition) -> bool {
        if self.terminated {
            return false;
        }

        let next = match (self.view, transition) {
            (_, Transition::Quit) => {
                self.terminated = true;
                return true;
            },
            (View::Login, Transition::LoginSucceeded) => View::Chat,
            (View::Login, Transition::LoginFailed) => return true,
            (View::Chat, Transition::OpenChannelList) => View::ChannelList,
            (View::ChannelList, Transition::SelectChannel | Transition::CloseChannelList) => {
                View::Chat
            },
            (View::Chat, Transition::OpenSettings) => View::Settings,
            (View::Settings, Transition::CloseSettings) => View::Chat,
            (View::Settings, Transition::Logout) => View::Login,
            (View::Chat | View::ChannelList | View::Settings, Transition::SessionExpired) => {
                View::Login
            },
            (view, transition) => {
                tracing::debug!(?view, ?transition, "ignoring illegal view transition");
                return false;
            },
        };

        tracing::debug!(from = ?self.view, to = ?next, ?transition, "view transition");
        self.view = next;
        self.focus = focus_of(next);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_login_username() {
        let state = ViewState::new();
        assert_eq!(state.view(), View::Login);
        assert_eq!(state.focus(), Focus::UsernameInput);
        assert!(!state.is_terminated());
    }

    #[test]
    fn login_success_enters_chat_with_message_focus() {
        let mut state = ViewState::new();
        assert!(state.apply(Transition::LoginSucceeded));
        assert_eq!(state.view(), View::Chat);
        assert_eq!(state.focus(), Focus::MessageInput);
    }

    #[test]
    fn login_failure_keeps_focus() {
        let mut state = ViewState::new();
        state.advance_focus();
        assert!(state.apply(Transition::LoginFailed));
        assert_eq!(state.view(), View::Login);
        assert_eq!(state.focus(), Focus::PasswordInput);
    }

    #[test]
    fn illegal_transitions_are_ignored() {
        let mut state = ViewState::new();
        assert!(!state.apply(Transition::OpenChannelList));
        assert!(!state.apply(Transition::SelectChannel));
        assert!(!state.apply(Transition::Logout));
        assert_eq!(state, ViewState::new());
    }

    #[test]
    fn channel_list_round_trip() {
        let mut state = ViewState::new();
        state.apply(Transition::LoginSucceeded);
        assert!(state.apply(Transition::OpenChannelList));
        assert_eq!(state.view(), View::ChannelList);
        assert_eq!(state.focus(), Focus::ChannelSearchInput);
        assert!(state.apply(Transition::SelectChannel));
        assert_eq!(state.view(), View::Chat);
        assert_eq!(state.focus(), Focus::MessageInput);
    }

    #[test]
    fn set_focus_rejects_target_outside_view() {
        let mut state = ViewState::new();
        let err = state.set_focus(Focus::MessageInput);
        assert_eq!(err, Err(FocusError { target: Focus::MessageInput, view: View::Login }));
        assert_eq!(state.focus(), Focus::UsernameInput);

        assert!(state.set_focus(Focus::PasswordInput).is_ok());
        assert_eq!(state.focus(), Focus::PasswordInput);
    }

    #[test]
    fn quit_is_absorbing() {
        let mut state = ViewState::new();
        assert!(state.apply(Transition::Quit));
        assert!(state.is_terminated());
        assert!(!state.apply(Transition::LoginSucceeded));
        assert!(!state.apply(Transition::Quit));
        assert_eq!(state.view(), View::Login);
    }
}
