//! Deterministic simulation harness for tchat session testing.
//!
//! In-memory implementations of the collaborator traits plus a scripted
//! [`tchat_app::Driver`], so the production [`tchat_app::Runtime`] runs
//! unchanged under tokio's paused clock. Nothing here touches the network,
//! the filesystem or the wall clock.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the session
//! invariants; [`SimDriver`] checks them after every render.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod memory_store;
pub mod scripted_backend;
pub mod sim_driver;
pub mod sim_env;
pub mod sim_token;

pub use invariants::{
    AppSnapshot, EchoTracksSend, FieldSnapshot, FieldWithinMax, FocusLegal, Invariant,
    InvariantRegistry, InvariantResult, ScrollInBounds, SelectionInBounds, SessionMatchesView,
    TimelineOrdered, TimelineSnapshot, UniqueMessageIds, Violation,
};
pub use memory_store::MemoryIdentityStore;
pub use scripted_backend::{BackendOp, ScriptedBackend};
pub use sim_driver::{SimDriver, SimDriverError, Step};
pub use sim_env::{SIM_EPOCH, SimEnv};
pub use sim_token::{SimTokenInspector, sim_token};
