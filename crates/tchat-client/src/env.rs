//! Production Environment implementation using system time.
//!
//! `SystemEnv` reads the wall clock and sleeps on the tokio timer. The wall
//! clock may step backwards (NTP adjustments); the session reducer never lets
//! its own notion of `now` decrease, so a step back only delays ticks.

use std::{
    future::Future,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use tchat_core::{Environment, Timestamp};

/// Production environment using the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn now(&self) -> Timestamp {
        let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Timestamp::from_millis(0).saturating_add(since_epoch)
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
