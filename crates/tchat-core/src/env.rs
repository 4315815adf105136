//! Environment abstraction for deterministic testing.
//!
//! Decouples session logic from the wall clock. Production uses the system
//! clock, simulation uses a virtual clock that only moves when told to.

use std::{future::Future, time::Duration};

use crate::Timestamp;

/// Abstract environment providing time and async sleeping.
///
/// Implementations MUST guarantee that `now()` never goes backwards within a
/// single execution context.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current wall-clock time.
    fn now(&self) -> Timestamp;

    /// Sleeps for the specified duration.
    ///
    /// Only driver and backend code may sleep; the session reducer never
    /// does.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}
