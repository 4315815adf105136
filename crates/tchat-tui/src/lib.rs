//! Terminal chat client.
//!
//! A thin shell over [`tchat_app::Driver`] that provides terminal-specific
//! I/O. All session logic lives in the generic [`tchat_app::Runtime`]; this
//! crate handles the command line, drawing and the one-shot commands.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cli;
pub mod config;
pub mod terminal;
pub mod ui;

pub use cli::CliError;
pub use config::{Backend, Cli, CliCommand, Config, ConfigError};
pub use terminal::{TerminalDriver, TerminalError};
