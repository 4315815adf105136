//! Driver trait for abstracting terminal I/O.
//!
//! The [`Driver`] trait decouples the session runtime from a concrete
//! terminal. Each frontend implements the trait, while the generic
//! [`crate::Runtime`] handles all orchestration.

use std::future::Future;

use crate::{App, AppEvent};

/// Abstracts input and drawing for the session runtime.
///
/// # Implementations
///
/// - **TUI**: crossterm for keyboard and resize events, ratatui for drawing
/// - **Simulation**: scripted input queue and recorded frames
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Wait for the next input event.
    ///
    /// Returns `None` for input that maps to no event (key releases,
    /// unbound keys). Must be cancellation safe: the runtime polls it inside
    /// `tokio::select!`.
    fn poll_event(&mut self) -> impl Future<Output = Result<Option<AppEvent>, Self::Error>> + Send;

    /// Draw the current state.
    ///
    /// # Errors
    ///
    /// Returns an error if drawing fails.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;

    /// Release terminal resources. Called once when the session ends.
    fn stop(&mut self);
}
