//! JSON bodies of the tchat HTTP API.
//!
//! Wire structs are lenient on input (unknown fields ignored, optional fields
//! defaulted) and converted into domain types at the edge. Missing fields the
//! domain cannot do without become [`TransportError::Decode`].

use serde::{Deserialize, Serialize};
use tchat_core::{
    AccessToken, AuthGrant, Channel, ChannelId, Conversation, Message, MessageId, Timestamp,
    TransportError, User, UserId,
};

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
    pub user: WireUser,
}

impl LoginResponse {
    pub fn into_grant(self) -> Result<AuthGrant, TransportError> {
        if self.token.is_empty() {
            return Err(TransportError::Decode("login response carries no token".into()));
        }
        Ok(AuthGrant { token: AccessToken::new(self.token), user: self.user.into_user()? })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireUser {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
}

impl WireUser {
    pub fn into_user(self) -> Result<User, TransportError> {
        if self.id.is_empty() {
            return Err(TransportError::Decode("user without id".into()));
        }
        Ok(User { id: UserId::new(self.id), username: self.username, email: self.email })
    }
}

/// Body of `POST /messages`. Exactly one of the targets is set.
#[derive(Debug, Serialize)]
pub(crate) struct SendRequest<'a> {
    pub sender_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_username: Option<&'a str>,
    pub body: &'a str,
}

impl<'a> SendRequest<'a> {
    pub fn new(sender: &'a UserId, to: &'a Conversation, body: &'a str) -> Self {
        let (channel_id, receiver_username) = match to {
            Conversation::Channel(id) => (Some(id.as_str()), None),
            Conversation::Direct(peer) => (None, Some(peer.as_str())),
        };
        Self { sender_id: sender.as_str(), channel_id, receiver_username, body }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireMessage {
    pub id: String,
    #[serde(alias = "content")]
    pub body: String,
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub user: Option<WireUser>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub created_at: Option<u64>,
}

impl WireMessage {
    /// Convert into a domain message filed under `conversation`.
    ///
    /// The server answers per conversation, so the requested conversation is
    /// authoritative for where the message is shown.
    pub fn into_message(self, conversation: &Conversation) -> Result<Message, TransportError> {
        let author_id = self
            .sender_id
            .or_else(|| self.user.as_ref().map(|user| user.id.clone()))
            .filter(|id| !id.is_empty())
            .ok_or_else(|| TransportError::Decode(format!("message {} has no author", self.id)))?;
        let sent_at = self.created_at.ok_or_else(|| {
            TransportError::Decode(format!("message {} has no timestamp", self.id))
        })?;
        let author_name =
            self.user.map(|user| user.username).filter(|username| !username.is_empty());

        Ok(Message {
            id: MessageId::new(self.id),
            body: self.body,
            author_id: UserId::new(author_id),
            author_name,
            conversation: conversation.clone(),
            sent_at: Timestamp::from_millis(sent_at),
        })
    }
}

/// Body of a successful `POST /messages`.
#[derive(Debug, Deserialize)]
pub(crate) struct MessageEnvelope {
    pub message: WireMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessagesResponse {
    #[serde(default)]
    pub messages: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireChannel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub users: Vec<WireUser>,
}

impl WireChannel {
    pub fn into_channel(self) -> Channel {
        Channel {
            id: ChannelId::new(self.id),
            name: self.name,
            description: self.description,
            members: self.users.into_iter().map(|user| UserId::new(user.id)).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelsResponse {
    #[serde(default)]
    pub channels: Vec<WireChannel>,
}

/// Error body some endpoints return alongside a failure status.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

/// Human-readable reason from an error response body.
pub(crate) fn error_reason(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|parsed| parsed.error)
        .unwrap_or_else(|_| body.trim().to_owned())
}

/// Decode a JSON body.
pub(crate) fn decode<'de, T: Deserialize<'de>>(body: &'de str) -> Result<T, TransportError> {
    serde_json::from_str(body).map_err(|e| TransportError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn general() -> Conversation {
        Conversation::Channel(ChannelId::from("general"))
    }

    #[test]
    fn send_request_targets_channel_or_peer() {
        let sender = UserId::from("u-1");

        let to_channel = general();
        let json = serde_json::to_value(SendRequest::new(&sender, &to_channel, "hi")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "sender_id": "u-1", "channel_id": "general", "body": "hi" })
        );

        let to_peer = Conversation::Direct("bob".into());
        let json = serde_json::to_value(SendRequest::new(&sender, &to_peer, "hi")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "sender_id": "u-1", "receiver_username": "bob", "body": "hi" })
        );
    }

    #[test]
    fn message_accepts_content_and_nested_user() {
        let wire: WireMessage = decode(
            r#"{"id":"m-1","content":"hello","user":{"id":"u-2","username":"bob"},
                "created_at":1700000000000,"channel":{"id":"general"}}"#,
        )
        .unwrap();
        let message = wire.into_message(&general()).unwrap();

        assert_eq!(message.id, MessageId::from("m-1"));
        assert_eq!(message.body, "hello");
        assert_eq!(message.author_id, UserId::from("u-2"));
        assert_eq!(message.author_name.as_deref(), Some("bob"));
        assert_eq!(message.conversation, general());
        assert_eq!(message.sent_at, Timestamp::from_millis(1_700_000_000_000));
    }

    #[test]
    fn sender_id_wins_over_nested_user() {
        let wire: WireMessage = decode(
            r#"{"id":"m-1","body":"x","sender_id":"u-1","user":{"id":"u-2"},"created_at":5}"#,
        )
        .unwrap();
        let message = wire.into_message(&general()).unwrap();

        assert_eq!(message.author_id, UserId::from("u-1"));
        assert_eq!(message.author_name, None);
    }

    #[test]
    fn incomplete_messages_are_decode_errors() {
        let no_author: WireMessage = decode(r#"{"id":"m-1","body":"x","created_at":5}"#).unwrap();
        assert!(matches!(no_author.into_message(&general()), Err(TransportError::Decode(_))));

        let no_time: WireMessage = decode(r#"{"id":"m-1","body":"x","sender_id":"u-1"}"#).unwrap();
        assert!(matches!(no_time.into_message(&general()), Err(TransportError::Decode(_))));

        assert!(matches!(decode::<WireMessage>("{"), Err(TransportError::Decode(_))));
    }

    #[test]
    fn send_response_is_enveloped() {
        let envelope: MessageEnvelope =
            decode(r#"{"message":{"id":"m-9","body":"hi","sender_id":"u-1","created_at":7}}"#)
                .unwrap();
        let message = envelope.message.into_message(&general()).unwrap();
        assert_eq!(message.id, MessageId::from("m-9"));

        assert!(decode::<MessageEnvelope>(r#"{"id":"m-9"}"#).is_err());
    }

    #[test]
    fn login_response_requires_token_and_user_id() {
        let ok: LoginResponse =
            decode(r#"{"token":"t","user":{"id":"u-1","username":"alice","email":"a@x"}}"#)
                .unwrap();
        let grant = ok.into_grant().unwrap();
        assert_eq!(grant.token.as_str(), "t");
        assert_eq!(grant.user.username, "alice");

        let no_token: LoginResponse = decode(r#"{"token":"","user":{"id":"u-1"}}"#).unwrap();
        assert!(no_token.into_grant().is_err());

        let no_id: LoginResponse = decode(r#"{"token":"t","user":{"id":""}}"#).unwrap();
        assert!(no_id.into_grant().is_err());
    }

    #[test]
    fn channels_collect_member_ids() {
        let response: ChannelsResponse = decode(
            r#"{"channels":[{"id":"c-1","name":"general","users":[{"id":"u-1"},{"id":"u-2"}]}]}"#,
        )
        .unwrap();
        let channels: Vec<_> =
            response.channels.into_iter().map(WireChannel::into_channel).collect();

        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].description, "");
        assert_eq!(channels[0].members, vec![UserId::from("u-1"), UserId::from("u-2")]);
    }

    #[test]
    fn error_reason_prefers_error_field() {
        assert_eq!(error_reason(r#"{"error":"account locked"}"#), "account locked");
        assert_eq!(error_reason("  plain text\n"), "plain text");
    }
}
