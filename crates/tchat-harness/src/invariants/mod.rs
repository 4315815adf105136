//! Invariant checking for deterministic simulation testing.
//!
//! Invariants are properties that must always hold during system execution.
//! Unlike example-based tests that check specific scenarios, invariants
//! verify behavioral properties across all possible execution paths.
//!
//! # Architecture
//!
//! The invariant system extracts observable state from an [`tchat_app::App`]
//! into an [`AppSnapshot`], then runs registered [`Invariant`] checks against
//! it. Violations are reported with enough context to replay the failure.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! let snapshot = AppSnapshot::from_app(&app);
//! registry.check_all(&snapshot)?;
//! ```

mod checks;
mod snapshot;

pub use checks::{
    EchoTracksSend, FieldWithinMax, FocusLegal, ScrollInBounds, SelectionInBounds,
    SessionMatchesView, TimelineOrdered, UniqueMessageIds,
};
pub use snapshot::{AppSnapshot, FieldSnapshot, TimelineSnapshot};

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// An invariant that can be checked against session state.
///
/// Invariants are behavioral properties that must always hold.
/// They capture WHAT must be true, not specific test scenarios.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against a snapshot.
    ///
    /// Returns `Ok(())` if the invariant holds, or a [`Violation`]
    /// describing what went wrong.
    fn check(&self, state: &AppSnapshot) -> InvariantResult;

    /// Build a violation of this invariant.
    fn violation(&self, message: String) -> Violation {
        Violation { invariant: self.name(), message }
    }
}

/// Registry of invariants to check.
///
/// Collects multiple invariants and runs them all against session state.
/// Use [`InvariantRegistry::standard()`] for the session invariants.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with the session invariants.
    ///
    /// Includes:
    /// - [`FocusLegal`]: focus is a legal target of the active view
    /// - [`FieldWithinMax`]: no field exceeds its limit, cursors in range
    /// - [`TimelineOrdered`]: timelines sorted by timestamp
    /// - [`UniqueMessageIds`]: no message id twice in a timeline
    /// - [`ScrollInBounds`]: scroll offsets within the buffer
    /// - [`SelectionInBounds`]: channel selection within the filtered list
    /// - [`SessionMatchesView`]: only Login is reachable logged out
    /// - [`EchoTracksSend`]: an echo always has its send in flight
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(FocusLegal);
        registry.add(FieldWithinMax);
        registry.add(TimelineOrdered);
        registry.add(UniqueMessageIds);
        registry.add(ScrollInBounds);
        registry.add(SelectionInBounds);
        registry.add(SessionMatchesView);
        registry.add(EchoTracksSend);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given state.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, state: &AppSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with every violation.
    ///
    /// Use this in tests where you want immediate failure with context.
    #[allow(clippy::panic, reason = "test assertion helper")]
    pub fn assert_all(&self, state: &AppSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
