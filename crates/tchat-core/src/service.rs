//! Collaborator contracts.
//!
//! The session core consumes these traits and never depends on a concrete
//! transport or store. Handles are injected at construction; there is no
//! ambient global client or database.
//!
//! Network traits return `Send` futures so the dispatcher can run them on
//! background tasks. Storage and token inspection are synchronous.

use std::future::Future;

use crate::{
    AccessToken, AuthError, AuthGrant, Channel, Claims, Conversation, Identity, Message,
    StoreError, Timestamp, TokenError, TransportError, User, UserId,
};

/// Authentication service.
pub trait Auth: Send + Sync + 'static {
    /// Exchange credentials for a token and the account they belong to.
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthGrant, AuthError>> + Send;
}

/// Messaging transport.
pub trait Messaging: Send + Sync + 'static {
    /// Submit a message. Returns the server-confirmed copy with its id.
    fn send(
        &self,
        token: &AccessToken,
        sender: &UserId,
        to: &Conversation,
        body: &str,
    ) -> impl Future<Output = Result<Message, TransportError>> + Send;

    /// Fetch messages of a conversation sent at or after `since` (all if
    /// `None`).
    ///
    /// The bound is inclusive, so callers see messages that share the
    /// cursor's millisecond and must de-duplicate by id. No ordering
    /// guarantee is made on the returned sequence.
    fn fetch_history(
        &self,
        token: &AccessToken,
        conversation: &Conversation,
        since: Option<Timestamp>,
    ) -> impl Future<Output = Result<Vec<Message>, TransportError>> + Send;

    /// List the channels visible to the authenticated user.
    fn list_channels(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Vec<Channel>, TransportError>> + Send;
}

/// Local persistent record of the authenticated identity.
pub trait IdentityStore: Send + Sync {
    /// Load the stored identity. `None` if nobody is logged in.
    fn load(&self) -> Result<Option<Identity>, StoreError>;

    /// Persist the identity, replacing any previous one.
    fn save(&self, identity: &Identity) -> Result<(), StoreError>;

    /// Forget the stored identity.
    fn clear(&self) -> Result<(), StoreError>;

    /// The stored user, if any.
    fn current_user(&self) -> Result<Option<User>, StoreError> {
        Ok(self.load()?.map(|identity| identity.user))
    }
}

/// Client-side token inspection.
///
/// Pure: string in, claims or failure out. Does not verify signatures and
/// does not compare against the clock.
pub trait TokenInspector: Send + Sync {
    /// Extract claims from a token string.
    fn parse(&self, token: &str) -> Result<Claims, TokenError>;
}
