//! External collaborators for the tchat session core.
//!
//! Concrete implementations of the [`tchat_core`] collaborator traits:
//!
//! - [`HttpClient`]: [`Auth`] and [`Messaging`] over the tchat HTTP API
//! - [`DemoBackend`]: offline, in-process stand-in for the server
//! - [`RedbIdentityStore`]: persistent [`IdentityStore`] backed by redb
//! - [`JwtInspector`]: [`TokenInspector`] reading JWT claims without
//!   verifying signatures
//! - [`SystemEnv`]: wall clock and tokio sleep
//!
//! [`Auth`]: tchat_core::Auth
//! [`Messaging`]: tchat_core::Messaging
//! [`IdentityStore`]: tchat_core::IdentityStore
//! [`TokenInspector`]: tchat_core::TokenInspector

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod demo;
mod env;
mod http;
mod jwt;
mod store;
mod wire;

pub use demo::DemoBackend;
pub use env::SystemEnv;
pub use http::HttpClient;
pub use jwt::{JwtInspector, unsigned_token};
pub use store::RedbIdentityStore;
