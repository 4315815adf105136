//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the terminal driver but for
//! deterministic testing. It implements [`Driver`] so the same
//! [`tchat_app::Runtime`] orchestration code runs in both production and
//! simulation.
//!
//! Input comes from a script. [`Step::WaitUntil`] holds back the rest of the
//! script until a rendered state satisfies a predicate, which is how a test
//! waits for a background result without knowing its timing.

use std::{collections::VecDeque, fmt};

use tchat_app::{App, AppEvent, Driver, KeyInput, TextFrame};

use crate::invariants::{AppSnapshot, InvariantRegistry};

/// Error type for simulation driver.
#[derive(Debug, Clone)]
pub struct SimDriverError(pub String);

impl fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

/// Predicate over the rendered session.
pub type Condition = Box<dyn Fn(&App) -> bool + Send>;

/// One entry of a driver script.
pub enum Step {
    /// Deliver an event.
    Input(AppEvent),
    /// Hold input until a render satisfies the condition.
    WaitUntil {
        /// Shown when a test times out waiting.
        label: &'static str,
        /// Condition checked on every render.
        condition: Condition,
    },
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(event) => f.debug_tuple("Input").field(event).finish(),
            Self::WaitUntil { label, .. } => f.debug_tuple("WaitUntil").field(label).finish(),
        }
    }
}

/// Simulation driver for deterministic testing.
///
/// Records every rendered frame. When the script runs dry, input blocks
/// forever, so scripts end with a quit.
#[derive(Debug, Default)]
pub struct SimDriver {
    script: VecDeque<Step>,
    frames: Vec<TextFrame>,
    invariants: Option<InvariantRegistryHandle>,
    stopped: bool,
}

/// Debug-printable wrapper so the driver can derive `Debug`.
struct InvariantRegistryHandle(InvariantRegistry);

impl fmt::Debug for InvariantRegistryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InvariantRegistry({})", self.0.len())
    }
}

impl SimDriver {
    /// Create a driver with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable invariant checking after every render.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(InvariantRegistryHandle(registry));
        self
    }

    /// Append an event.
    #[must_use]
    pub fn event(mut self, event: AppEvent) -> Self {
        self.script.push_back(Step::Input(event));
        self
    }

    /// Append a key press.
    #[must_use]
    pub fn key(self, key: KeyInput) -> Self {
        self.event(AppEvent::Key(key))
    }

    /// Append one key press per character of `text`.
    #[must_use]
    pub fn type_text(self, text: &str) -> Self {
        text.chars().fold(self, |driver, ch| driver.key(KeyInput::Char(ch)))
    }

    /// Append a wait for a rendered state satisfying `condition`.
    #[must_use]
    pub fn wait_until(
        mut self,
        label: &'static str,
        condition: impl Fn(&App) -> bool + Send + 'static,
    ) -> Self {
        self.script.push_back(Step::WaitUntil { label, condition: Box::new(condition) });
        self
    }

    /// Append Ctrl+C.
    #[must_use]
    pub fn quit(self) -> Self {
        self.key(KeyInput::Ctrl('c'))
    }

    /// Every frame rendered so far.
    pub fn frames(&self) -> &[TextFrame] {
        &self.frames
    }

    /// Most recent frame.
    pub fn last_frame(&self) -> Option<&TextFrame> {
        self.frames.last()
    }

    /// Steps not consumed yet.
    pub fn remaining(&self) -> &VecDeque<Step> {
        &self.script
    }

    /// Label of the wait currently holding the script, if any.
    pub fn waiting_on(&self) -> Option<&'static str> {
        match self.script.front() {
            Some(Step::WaitUntil { label, .. }) => Some(label),
            _ => None,
        }
    }

    /// True once the runtime has stopped the driver.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Check invariants against App state.
    fn check_invariants(&self, app: &App) -> Result<(), SimDriverError> {
        let Some(InvariantRegistryHandle(registry)) = &self.invariants else {
            return Ok(());
        };
        registry.check_all(&AppSnapshot::from_app(app)).map_err(|violations| {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            SimDriverError(format!("invariant violation: {}", messages.join("; ")))
        })
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        if matches!(self.script.front(), Some(Step::Input(_))) {
            if let Some(Step::Input(event)) = self.script.pop_front() {
                return Ok(Some(event));
            }
        }
        std::future::pending().await
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        self.check_invariants(app)?;
        self.frames.push(app.current_frame());

        while let Some(Step::WaitUntil { label, condition }) = self.script.front() {
            if !condition(app) {
                break;
            }
            tracing::trace!(label, "sim wait satisfied");
            self.script.pop_front();
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}
