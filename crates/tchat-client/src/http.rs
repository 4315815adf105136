//! HTTP transport for the tchat server API.
//!
//! Endpoints:
//!
//! | Operation        | Request                                         |
//! |------------------|-------------------------------------------------|
//! | login            | `POST /auth/login`                              |
//! | send             | `POST /messages`                                |
//! | history          | `GET /messages?channel_id=..\|peer=..&since=..` |
//! | latest message   | `GET /messages/last?sender_id=..&receiver_username=..` |
//! | channels         | `GET /channels`                                 |
//!
//! Every request after login carries the token as a bearer credential.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use tchat_core::{
    AccessToken, Auth, AuthError, AuthGrant, Channel, Conversation, Message, Messaging, Timestamp,
    TransportError, UserId,
};

use crate::wire::{
    self, ChannelsResponse, LoginRequest, LoginResponse, MessageEnvelope, MessagesResponse,
    SendRequest, WireChannel, WireMessage,
};

/// Client for the tchat HTTP API.
///
/// Clone is cheap: clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpClient {
    /// Per-request timeout.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a client for the server at `base_url` (e.g. `http://localhost:8080`).
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Connection` if the HTTP client cannot be built
    /// (TLS backend initialization).
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { base_url, http })
    }

    /// Server base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Most recent message in the direct conversation between `sender` and
    /// `peer`. `None` if they have never exchanged a message.
    ///
    /// # Errors
    ///
    /// Transport failures and non-success statuses other than 404.
    pub async fn last_message(
        &self,
        token: &AccessToken,
        sender: &UserId,
        peer: &str,
    ) -> Result<Option<Message>, TransportError> {
        let request = self
            .http
            .get(self.url("/messages/last"))
            .bearer_auth(token.as_str())
            .query(&[("sender_id", sender.as_str()), ("receiver_username", peer)]);
        let response = request.send().await.map_err(transport_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = success_body(response).await?;
        let wire: WireMessage = wire::decode(&body)?;
        wire.into_message(&Conversation::Direct(peer.to_owned())).map(Some)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn fetch(&self, request: RequestBuilder) -> Result<String, TransportError> {
        let response = request.send().await.map_err(transport_error)?;
        success_body(response).await
    }
}

impl Auth for HttpClient {
    async fn login(&self, username: &str, password: &str) -> Result<AuthGrant, AuthError> {
        tracing::debug!(%username, "login request");
        let request =
            self.http.post(self.url("/auth/login")).json(&LoginRequest { username, password });
        let response = request.send().await.map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        match status {
            s if s.is_success() => Ok(wire::decode::<LoginResponse>(&body)?.into_grant()?),
            StatusCode::UNAUTHORIZED => Err(AuthError::InvalidCredentials),
            StatusCode::BAD_REQUEST | StatusCode::FORBIDDEN => {
                Err(AuthError::Rejected(wire::error_reason(&body)))
            },
            s => Err(status_error(s, &body).into()),
        }
    }
}

impl Messaging for HttpClient {
    async fn send(
        &self,
        token: &AccessToken,
        sender: &UserId,
        to: &Conversation,
        body: &str,
    ) -> Result<Message, TransportError> {
        let request = self
            .http
            .post(self.url("/messages"))
            .bearer_auth(token.as_str())
            .json(&SendRequest::new(sender, to, body));
        let response = self.fetch(request).await?;

        let message = wire::decode::<MessageEnvelope>(&response)?.message.into_message(to)?;
        tracing::debug!(id = %message.id, conversation = %to, "message accepted");
        Ok(message)
    }

    async fn fetch_history(
        &self,
        token: &AccessToken,
        conversation: &Conversation,
        since: Option<Timestamp>,
    ) -> Result<Vec<Message>, TransportError> {
        let target = match conversation {
            Conversation::Channel(id) => ("channel_id", id.as_str()),
            Conversation::Direct(peer) => ("peer", peer.as_str()),
        };
        let mut request =
            self.http.get(self.url("/messages")).bearer_auth(token.as_str()).query(&[target]);
        if let Some(since) = since {
            request = request.query(&[("since", since.as_millis())]);
        }
        let response = self.fetch(request).await?;

        wire::decode::<MessagesResponse>(&response)?
            .messages
            .into_iter()
            .map(|message| message.into_message(conversation))
            .collect()
    }

    async fn list_channels(&self, token: &AccessToken) -> Result<Vec<Channel>, TransportError> {
        let request = self.http.get(self.url("/channels")).bearer_auth(token.as_str());
        let response = self.fetch(request).await?;

        Ok(wire::decode::<ChannelsResponse>(&response)?
            .channels
            .into_iter()
            .map(WireChannel::into_channel)
            .collect())
    }
}

/// Body of a successful response, or the status mapped to an error.
async fn success_body(response: Response) -> Result<String, TransportError> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;
    if status.is_success() { Ok(body) } else { Err(status_error(status, &body)) }
}

fn status_error(status: StatusCode, body: &str) -> TransportError {
    if status == StatusCode::UNAUTHORIZED {
        TransportError::Unauthorized
    } else {
        TransportError::Status { status: status.as_u16(), body: wire::error_reason(body) }
    }
}

fn transport_error(err: reqwest::Error) -> TransportError {
    if err.is_decode() {
        TransportError::Decode(err.to_string())
    } else {
        TransportError::Connection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = HttpClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.url("/messages"), "http://localhost:8080/messages");
    }

    #[test]
    fn unauthorized_status_maps_to_unauthorized() {
        assert_eq!(status_error(StatusCode::UNAUTHORIZED, "nope"), TransportError::Unauthorized);
    }

    #[test]
    fn other_statuses_carry_reason() {
        let err = status_error(StatusCode::NOT_FOUND, r#"{"error":"receiver not found"}"#);
        assert_eq!(err, TransportError::Status { status: 404, body: "receiver not found".into() });
        assert_eq!(err.to_string(), "server error (404): receiver not found");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_error() {
        // Port 9 (discard) on loopback is closed on test machines
        let client = HttpClient::new("http://127.0.0.1:9").unwrap();
        let err = client.list_channels(&AccessToken::new("t")).await.unwrap_err();
        assert!(matches!(err, TransportError::Connection(_)), "got {err:?}");
    }
}
