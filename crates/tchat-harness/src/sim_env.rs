//! Simulated environment on tokio's clock.
//!
//! Under `#[tokio::test(start_paused = true)]` time only moves when every task
//! is idle or the test advances it, so timestamps, ticks and backend latency
//! are reproducible run to run.

use std::{future::Future, time::Duration};

use tchat_core::{Environment, Timestamp};
use tokio::time::Instant;

/// Wall-clock origin of simulations: 2023-11-14 22:13:20 UTC.
pub const SIM_EPOCH: Timestamp = Timestamp::from_millis(1_700_000_000_000);

/// Environment whose wall clock is a fixed origin plus tokio's elapsed time.
///
/// Create it inside the runtime so the reference instant comes from the
/// paused clock.
#[derive(Debug, Clone, Copy)]
pub struct SimEnv {
    origin: Timestamp,
    started: Instant,
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEnv {
    /// Environment starting at [`SIM_EPOCH`].
    pub fn new() -> Self {
        Self::starting_at(SIM_EPOCH)
    }

    /// Environment starting at `origin`.
    pub fn starting_at(origin: Timestamp) -> Self {
        Self { origin, started: Instant::now() }
    }

    /// Time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Environment for SimEnv {
    fn now(&self) -> Timestamp {
        self.origin.saturating_add(self.started.elapsed())
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn clock_follows_virtual_time() {
        let env = SimEnv::new();
        assert_eq!(env.now(), SIM_EPOCH);

        env.sleep(Duration::from_secs(90)).await;

        assert_eq!(env.now(), SIM_EPOCH.saturating_add(Duration::from_secs(90)));
    }

    #[tokio::test(start_paused = true)]
    async fn copies_share_the_origin() {
        let env = SimEnv::starting_at(Timestamp::from_millis(0));
        let copy = env;
        tokio::time::advance(Duration::from_millis(250)).await;

        assert_eq!(env.now(), copy.now());
        assert_eq!(copy.now().as_millis(), 250);
    }
}
