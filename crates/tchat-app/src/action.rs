//! Session side-effects and intents.
//!
//! This module defines the [`AppAction`] enum, instructions produced by the
//! [`crate::App`] reducer for the runtime to execute.

use tchat_core::Identity;

use crate::{Command, OpHandle};

/// Actions produced by the App reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Redraw the current frame.
    Render,

    /// Stop the event loop. No further events are processed.
    Quit,

    /// Run a command on a background worker.
    Dispatch(Command),

    /// Abort the background worker of a cancelled command.
    Cancel {
        /// Handle of the cancelled command.
        handle: OpHandle,
    },

    /// Persist the authenticated identity.
    PersistIdentity(Identity),

    /// Forget the persisted identity.
    ClearIdentity,
}
