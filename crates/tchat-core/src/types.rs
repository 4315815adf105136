//! Domain model.
//!
//! Identifiers are opaque server-assigned strings wrapped in newtypes so a
//! channel id can never be passed where a user id is expected. All types are
//! immutable values once received from a collaborator.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a server-assigned identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Server-assigned user identifier. Identity key of [`User`].
    UserId
);
string_id!(
    /// Server-assigned channel identifier. Identity key of [`Channel`].
    ChannelId
);
string_id!(
    /// Server-assigned message identifier. De-duplication key in timelines.
    MessageId
);

/// Milliseconds since the Unix epoch.
///
/// Totally ordered; timelines sort on it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    const MILLIS_PER_MINUTE: u64 = 60_000;
    const MINUTES_PER_DAY: u64 = 24 * 60;

    /// Create a timestamp from milliseconds since the Unix epoch.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Milliseconds since the Unix epoch.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Timestamp `duration` later, saturating at the maximum.
    #[must_use]
    pub fn saturating_add(self, duration: Duration) -> Self {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(millis))
    }

    /// Time elapsed since `earlier`. Zero if `earlier` is in the future.
    pub fn saturating_since(self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    /// Wall-clock time of day in UTC as `HH:MM`.
    pub fn clock_time(self) -> String {
        let minutes = (self.0 / Self::MILLIS_PER_MINUTE) % Self::MINUTES_PER_DAY;
        format!("{:02}:{:02}", minutes / 60, minutes % 60)
    }
}

/// Bearer token issued by the authentication service.
///
/// Debug output is redacted so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// An account known to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Server-assigned identifier.
    pub id: UserId,
    /// Login and display name.
    pub username: String,
    /// Contact address.
    pub email: String,
}

/// A named channel. Read-only cache entry populated by fetch results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Server-assigned identifier.
    pub id: ChannelId,
    /// Display name (without the leading `#`).
    pub name: String,
    /// Free-form topic.
    pub description: String,
    /// Members of the channel.
    pub members: Vec<UserId>,
}

/// Where a message lives: a channel or a direct conversation with a peer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conversation {
    /// A channel, by id.
    Channel(ChannelId),
    /// A direct conversation, by the peer's username.
    Direct(String),
}

impl Conversation {
    /// Channel id if this is a channel conversation.
    pub fn channel_id(&self) -> Option<&ChannelId> {
        match self {
            Self::Channel(id) => Some(id),
            Self::Direct(_) => None,
        }
    }
}

impl fmt::Display for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(id) => write!(f, "#{id}"),
            Self::Direct(peer) => write!(f, "@{peer}"),
        }
    }
}

/// A chat message. Never mutated after it is received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Server-assigned identifier.
    pub id: MessageId,
    /// Message text.
    pub body: String,
    /// Author's user id.
    pub author_id: UserId,
    /// Author's username when the server includes it.
    pub author_name: Option<String>,
    /// Conversation the message belongs to.
    pub conversation: Conversation,
    /// Server timestamp.
    pub sent_at: Timestamp,
}

impl Message {
    /// Name to show for the author: username if known, else the raw id.
    pub fn author_label(&self) -> &str {
        self.author_name.as_deref().unwrap_or_else(|| self.author_id.as_str())
    }
}

/// Successful login result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGrant {
    /// Bearer token for subsequent requests.
    pub token: AccessToken,
    /// The authenticated account.
    pub user: User,
}

/// Persisted authenticated identity, used to resume a session at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The authenticated account.
    pub user: User,
    /// Bearer token issued at login.
    pub token: AccessToken,
}

/// Claims extracted from an access token for client-side expiry UX.
///
/// Never used as an authorization decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject of the token.
    pub user_id: UserId,
    /// Expiry. `None` if the token does not expire.
    pub expires_at: Option<Timestamp>,
}

impl Claims {
    /// True if the token has expired at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_time_wraps_at_midnight() {
        let one_day = 24 * 60 * 60 * 1000;
        let ts = Timestamp::from_millis(one_day + 13 * 3_600_000 + 7 * 60_000 + 59_999);
        assert_eq!(ts.clock_time(), "13:07");
    }

    #[test]
    fn saturating_since_never_negative() {
        let early = Timestamp::from_millis(1_000);
        let late = Timestamp::from_millis(4_500);
        assert_eq!(late.saturating_since(early), Duration::from_millis(3_500));
        assert_eq!(early.saturating_since(late), Duration::ZERO);
    }

    #[test]
    fn access_token_debug_is_redacted() {
        let token = AccessToken::new("secret-bearer");
        assert!(!format!("{token:?}").contains("secret"));
    }

    #[test]
    fn claims_expiry_is_inclusive() {
        let claims = Claims {
            user_id: UserId::from("u-1"),
            expires_at: Some(Timestamp::from_millis(10)),
        };
        assert!(!claims.is_expired(Timestamp::from_millis(9)));
        assert!(claims.is_expired(Timestamp::from_millis(10)));

        let forever = Claims { user_id: UserId::from("u-1"), expires_at: None };
        assert!(!forever.is_expired(Timestamp::from_millis(u64::MAX)));
    }

    #[test]
    fn conversation_display() {
        assert_eq!(Conversation::Channel(ChannelId::from("general")).to_string(), "#general");
        assert_eq!(Conversation::Direct("bob".into()).to_string(), "@bob");
    }
}
