//! Generic runtime for session orchestration.
//!
//! The Runtime drives the event loop, coordinating between:
//! - [`App`]: session state machine, the only writer of session state
//! - [`CommandRunner`]: background tasks for network commands
//! - [`Driver`]: platform-specific input and drawing
//!
//! Events come from three sources, drained one at a time: driver input,
//! command results and a periodic tick. Each is reduced by [`App::handle`]
//! and the resulting actions are executed before the next event is taken.

use std::{sync::Arc, time::Duration};

use tchat_core::{Auth, Environment, IdentityStore, Messaging, TokenInspector};
use tokio::{sync::mpsc, time::MissedTickBehavior};

use crate::{App, AppAction, AppConfig, AppEvent, CommandRunner, Driver};

/// Interval between [`AppEvent::Tick`]s.
pub const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Generic runtime that orchestrates App, CommandRunner and Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `B`: Network backend (auth and messaging)
/// - `E`: Environment providing the clock
pub struct Runtime<D, B, E>
where
    D: Driver,
    B: Auth + Messaging,
    E: Environment,
{
    driver: D,
    app: App,
    runner: CommandRunner<B>,
    results: mpsc::UnboundedReceiver<AppEvent>,
    store: Arc<dyn IdentityStore>,
    inspector: Arc<dyn TokenInspector>,
    env: E,
}

impl<D, B, E> Runtime<D, B, E>
where
    D: Driver,
    B: Auth + Messaging,
    E: Environment,
{
    /// Create a runtime. Collaborators are injected; nothing is global.
    pub fn new(
        driver: D,
        backend: Arc<B>,
        store: Arc<dyn IdentityStore>,
        inspector: Arc<dyn TokenInspector>,
        env: E,
        config: AppConfig,
    ) -> Self {
        let (tx, results) = mpsc::unbounded_channel();
        let runner = CommandRunner::new(backend, Arc::clone(&inspector), tx);
        let app = App::new(config, env.now());
        Self { driver, app, runner, results, store, inspector, env }
    }

    /// Run the event loop until the session quits. Call once.
    ///
    /// On exit every outstanding command is aborted and the results channel
    /// is closed, so nothing is delivered after termination.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to read input or draw.
    pub async fn run(&mut self) -> Result<(), D::Error> {
        let result = self.event_loop().await;
        self.shutdown();
        result
    }

    async fn event_loop(&mut self) -> Result<(), D::Error> {
        self.resume()?;
        self.driver.render(&self.app)?;

        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let event = tokio::select! {
                input = self.driver.poll_event() => input?,
                Some(result) = self.results.recv() => Some(result),
                _ = ticker.tick() => Some(AppEvent::Tick { now: self.env.now() }),
            };

            let Some(event) = event else {
                continue;
            };
            if self.step(event)? {
                return Ok(());
            }
        }
    }

    /// Reduce one event and execute the resulting actions.
    ///
    /// Returns `true` if the session quit.
    pub fn step(&mut self, event: AppEvent) -> Result<bool, D::Error> {
        self.runner.reap();
        let actions = self.app.handle(event);
        self.execute(actions)
    }

    fn execute(&mut self, actions: Vec<AppAction>) -> Result<bool, D::Error> {
        let mut quit = false;
        for action in actions {
            match action {
                AppAction::Render => self.driver.render(&self.app)?,
                AppAction::Quit => quit = true,
                AppAction::Dispatch(command) => self.runner.spawn(command),
                AppAction::Cancel { handle } => self.runner.cancel(handle),
                AppAction::PersistIdentity(identity) => {
                    if let Err(error) = self.store.save(&identity) {
                        tracing::warn!(%error, "failed to persist identity");
                    }
                },
                AppAction::ClearIdentity => {
                    if let Err(error) = self.store.clear() {
                        tracing::warn!(%error, "failed to clear identity");
                    }
                },
            }
        }
        Ok(quit)
    }

    /// Resume a stored, unexpired identity without a network round trip.
    fn resume(&mut self) -> Result<(), D::Error> {
        let identity = match self.store.load() {
            Ok(Some(identity)) => identity,
            Ok(None) => return Ok(()),
            Err(error) => {
                tracing::warn!(%error, "failed to load stored identity");
                return Ok(());
            },
        };

        let claims = match self.inspector.parse(identity.token.as_str()) {
            Ok(claims) if !claims.is_expired(self.env.now()) => claims,
            Ok(_) => {
                tracing::info!("stored session expired");
                self.forget_identity();
                return Ok(());
            },
            Err(error) => {
                tracing::warn!(%error, "stored token unreadable");
                self.forget_identity();
                return Ok(());
            },
        };

        self.step(AppEvent::SessionResumed { identity, expires_at: claims.expires_at })?;
        Ok(())
    }

    fn forget_identity(&self) {
        if let Err(error) = self.store.clear() {
            tracing::warn!(%error, "failed to clear identity");
        }
    }

    fn shutdown(&mut self) {
        self.runner.shutdown();
        self.results.close();
        while self.results.try_recv().is_ok() {}
        self.driver.stop();
    }

    /// Get a reference to the App.
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Get a reference to the driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Number of command tasks still running.
    pub fn in_flight(&self) -> usize {
        self.runner.in_flight()
    }
}
