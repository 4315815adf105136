//! Core types for tchat.
//!
//! Domain model shared by every tchat crate: users, channels, messages and
//! the identifiers that key them, plus the contracts of the external
//! collaborators the interactive session consumes (authentication,
//! messaging transport, identity storage and token inspection).
//!
//! Nothing in this crate performs I/O. Implementations of the collaborator
//! traits live in `tchat-client` (production) and `tchat-harness`
//! (deterministic simulation).

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
pub mod error;
pub mod service;
pub mod types;

pub use env::Environment;
pub use error::{AuthError, ErrorKind, StoreError, TokenError, TransportError};
pub use service::{Auth, IdentityStore, Messaging, TokenInspector};
pub use types::{
    AccessToken, AuthGrant, Channel, ChannelId, Claims, Conversation, Identity, Message,
    MessageId, Timestamp, User, UserId,
};
