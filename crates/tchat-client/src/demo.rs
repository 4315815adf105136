//! Offline demo server.
//!
//! Runs the whole chat API in-process so the client can be tried without a
//! server. One account (`demo`/`demo`), two channels, and an `echo` user
//! that answers every direct message with the same text.

use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use tchat_core::{
    AccessToken, Auth, AuthError, AuthGrant, Channel, ChannelId, Conversation, Environment,
    Message, MessageId, Messaging, Timestamp, TokenInspector, TransportError, User, UserId,
};

use crate::{JwtInspector, unsigned_token};

const DEMO_PASSWORD: &str = "demo";
const ECHO_USER: &str = "echo";

struct Board {
    users: Vec<User>,
    channels: Vec<Channel>,
    messages: Vec<Message>,
    next_id: u64,
}

impl Board {
    fn seeded(now: Timestamp) -> Self {
        let users: Vec<User> = ["demo", ECHO_USER]
            .into_iter()
            .map(|name| User {
                id: UserId::new(format!("demo-{name}")),
                username: name.to_owned(),
                email: format!("{name}@tchat.invalid"),
            })
            .collect();
        let members: Vec<UserId> = users.iter().map(|u| u.id.clone()).collect();
        let channels = [("general", "Everything tchat"), ("random", "Anything else")]
            .into_iter()
            .map(|(name, description)| Channel {
                id: ChannelId::from(name),
                name: name.to_owned(),
                description: description.to_owned(),
                members: members.clone(),
            })
            .collect();

        let mut board = Self { users, channels, messages: Vec::new(), next_id: 0 };
        if let Some(echo) = board.user(ECHO_USER).cloned() {
            board.post(
                &echo,
                Conversation::Channel(ChannelId::from("general")),
                "Welcome to tchat! Ctrl+L lists channels, direct messages to @echo come back.",
                now,
            );
        }
        board
    }

    fn user(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|u| u.username == username)
    }

    fn post(
        &mut self,
        author: &User,
        conversation: Conversation,
        body: &str,
        at: Timestamp,
    ) -> Message {
        self.next_id += 1;
        let message = Message {
            id: MessageId::new(format!("demo-m{}", self.next_id)),
            body: body.to_owned(),
            author_id: author.id.clone(),
            author_name: Some(author.username.clone()),
            conversation,
            sent_at: at,
        };
        self.messages.push(message.clone());
        message
    }

    /// Messages in `conversation` as seen by `viewer`.
    ///
    /// Direct messages are stored under the recipient's name.
    fn visible<'a>(
        &'a self,
        conversation: &'a Conversation,
        viewer: &'a User,
    ) -> impl Iterator<Item = &'a Message> + 'a {
        self.messages.iter().filter(move |m| match conversation {
            Conversation::Channel(_) => &m.conversation == conversation,
            Conversation::Direct(peer) => {
                (&m.conversation == conversation && m.author_id == viewer.id)
                    || (m.conversation == Conversation::Direct(viewer.username.clone())
                        && m.author_name.as_deref() == Some(peer.as_str()))
            },
        })
    }
}

/// In-process [`Auth`] + [`Messaging`] implementation.
///
/// Issues unsigned JWTs valid for [`DemoBackend::TOKEN_TTL`], so expiry and
/// resume behave as they would against a real server.
pub struct DemoBackend<E: Environment> {
    env: E,
    board: Mutex<Board>,
}

impl<E: Environment> DemoBackend<E> {
    /// Simulated round-trip time of every call.
    pub const LATENCY: Duration = Duration::from_millis(150);
    /// Lifetime of issued tokens.
    pub const TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

    /// Create the seeded demo world.
    pub fn new(env: E) -> Self {
        let board = Board::seeded(env.now());
        Self { env, board: Mutex::new(board) }
    }

    fn with_board<T>(&self, f: impl FnOnce(&mut Board) -> T) -> T {
        let mut board = self.board.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut board)
    }

    fn authorize(&self, board: &Board, token: &AccessToken) -> Result<User, TransportError> {
        let claims =
            JwtInspector.parse(token.as_str()).map_err(|_| TransportError::Unauthorized)?;
        if claims.is_expired(self.env.now()) {
            return Err(TransportError::Unauthorized);
        }
        board
            .users
            .iter()
            .find(|u| u.id == claims.user_id)
            .cloned()
            .ok_or(TransportError::Unauthorized)
    }
}

impl<E: Environment> std::fmt::Debug for DemoBackend<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemoBackend").finish_non_exhaustive()
    }
}

impl<E: Environment> Auth for DemoBackend<E> {
    async fn login(&self, username: &str, password: &str) -> Result<AuthGrant, AuthError> {
        self.env.sleep(Self::LATENCY).await;
        let expires_at = self.env.now().saturating_add(Self::TOKEN_TTL);

        let user = self.with_board(|board| board.user(username).cloned());
        match user {
            Some(user) if user.username != ECHO_USER && password == DEMO_PASSWORD => {
                tracing::info!(%username, "demo login");
                Ok(AuthGrant { token: unsigned_token(&user.id, Some(expires_at)), user })
            },
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}

impl<E: Environment> Messaging for DemoBackend<E> {
    async fn send(
        &self,
        token: &AccessToken,
        sender: &UserId,
        to: &Conversation,
        body: &str,
    ) -> Result<Message, TransportError> {
        self.env.sleep(Self::LATENCY).await;
        let now = self.env.now();
        self.with_board(|board| -> Result<Message, TransportError> {
            let user = self.authorize(board, token)?;
            if &user.id != sender {
                return Err(TransportError::Status { status: 403, body: "sender mismatch".into() });
            }
            if body.trim().is_empty() {
                return Err(TransportError::Status {
                    status: 400,
                    body: "message cannot be empty".into(),
                });
            }
            let echo = match to {
                Conversation::Channel(id) if board.channels.iter().any(|c| &c.id == id) => None,
                Conversation::Direct(peer) if peer == ECHO_USER => board.user(ECHO_USER).cloned(),
                Conversation::Direct(peer) if board.user(peer).is_some() => None,
                _ => {
                    return Err(TransportError::Status {
                        status: 404,
                        body: format!("{to} not found"),
                    });
                },
            };

            let sent = board.post(&user, to.clone(), body, now);
            if let Some(echo) = echo {
                let reply_at = now.saturating_add(Duration::from_millis(1));
                board.post(&echo, Conversation::Direct(user.username.clone()), body, reply_at);
            }
            Ok(sent)
        })
    }

    async fn fetch_history(
        &self,
        token: &AccessToken,
        conversation: &Conversation,
        since: Option<Timestamp>,
    ) -> Result<Vec<Message>, TransportError> {
        self.env.sleep(Self::LATENCY).await;
        self.with_board(|board| -> Result<Vec<Message>, TransportError> {
            let viewer = self.authorize(board, token)?;
            Ok(board
                .visible(conversation, &viewer)
                .filter(|m| since.is_none_or(|since| m.sent_at >= since))
                .cloned()
                .collect())
        })
    }

    async fn list_channels(&self, token: &AccessToken) -> Result<Vec<Channel>, TransportError> {
        self.env.sleep(Self::LATENCY).await;
        self.with_board(|board| -> Result<Vec<Channel>, TransportError> {
            self.authorize(board, token)?;
            Ok(board.channels.clone())
        })
    }
}
