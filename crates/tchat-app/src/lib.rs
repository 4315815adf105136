//! Interactive session core for tchat.
//!
//! Pure state machines plus a generic runtime for the terminal chat client,
//! enabling deterministic simulation testing with the same code that runs in
//! production.
//!
//! # Components
//!
//! - [`FieldSet`]: editable single-line inputs with masking and length limits
//! - [`focus`]: legal focus targets per view and Tab order
//! - [`ViewState`]: view transitions, gated by session state
//! - [`Timeline`]: ordered, de-duplicated message history with a viewport
//! - [`Dispatcher`]: pending-op slots for network commands
//! - [`App`]: the reducer tying the above together
//! - [`render()`]: pure projection of [`App`] to a [`TextFrame`]
//! - [`Runtime`]: event loop over a [`Driver`], with [`CommandRunner`]
//!   executing commands on background tasks

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod commands;
mod dispatch;
mod driver;
mod event;
mod field;
pub mod focus;
mod input;
mod render;
mod runner;
mod runtime;
mod state;
mod timeline;
mod view;

pub use action::AppAction;
pub use app::{App, CHAT_CHROME_ROWS, default_conversation};
pub use commands::{ComposeInput, parse as parse_compose};
pub use dispatch::{
    Command, CommandKind, DispatchError, Dispatcher, OpHandle, PendingOp, Request,
};
pub use driver::Driver;
pub use event::AppEvent;
pub use field::{Field, FieldId, FieldSet, MASK_GLYPH};
pub use focus::{Focus, FocusError};
pub use input::KeyInput;
pub use render::{FrameLine, TextFrame, Tone, render};
pub use runner::CommandRunner;
pub use runtime::{Runtime, TICK_INTERVAL};
pub use state::{AppConfig, ConnectionState, Echo, Notice, NoticeLevel, Session};
pub use timeline::Timeline;
pub use view::{Transition, View, ViewState};
