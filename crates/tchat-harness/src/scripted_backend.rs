//! Scripted in-memory chat server.
//!
//! Implements [`Auth`] and [`Messaging`] over a small in-memory world of
//! accounts, channels and messages. Every call first sleeps for the configured
//! latency on the simulation clock, then consumes any failure injected for its
//! operation with [`ScriptedBackend::fail_next`].

use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, PoisonError},
    time::Duration,
};

use tchat_core::{
    AccessToken, Auth, AuthError, AuthGrant, Channel, ChannelId, Conversation, Environment,
    Message, MessageId, Messaging, Timestamp, TokenInspector, TransportError, User, UserId,
};

use crate::{SimEnv, SimTokenInspector, sim_token};

/// Backend operations, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    /// [`Auth::login`].
    Login,
    /// [`Messaging::send`].
    Send,
    /// [`Messaging::fetch_history`].
    FetchHistory,
    /// [`Messaging::list_channels`].
    ListChannels,
}

struct Account {
    user: User,
    password: String,
}

#[derive(Default)]
struct World {
    accounts: Vec<Account>,
    channels: Vec<Channel>,
    messages: Vec<Message>,
    next_message: u64,
    failures: HashMap<BackendOp, VecDeque<TransportError>>,
    calls: HashMap<BackendOp, usize>,
}

impl World {
    /// Count the call and pop the next injected failure for `op`.
    fn record(&mut self, op: BackendOp) -> Result<(), TransportError> {
        *self.calls.entry(op).or_default() += 1;
        match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn user_by_name(&self, username: &str) -> Option<&User> {
        self.accounts.iter().map(|a| &a.user).find(|u| u.username == username)
    }

    fn append(
        &mut self,
        author: &User,
        conversation: Conversation,
        body: &str,
        at: Timestamp,
    ) -> Message {
        self.next_message += 1;
        let message = Message {
            id: MessageId::new(format!("m-{}", self.next_message)),
            body: body.to_string(),
            author_id: author.id.clone(),
            author_name: Some(author.username.clone()),
            conversation,
            sent_at: at,
        };
        self.messages.push(message.clone());
        message
    }
}

/// Whether `message` belongs to `conversation` as seen by `viewer`.
///
/// Direct messages are stored under the recipient's name, so the same
/// exchange is keyed differently for each side.
fn visible_in(message: &Message, conversation: &Conversation, viewer: &User) -> bool {
    match conversation {
        Conversation::Channel(_) => &message.conversation == conversation,
        Conversation::Direct(peer) => {
            let sent = &message.conversation == conversation && message.author_id == viewer.id;
            let received = message.conversation == Conversation::Direct(viewer.username.clone())
                && message.author_name.as_deref() == Some(peer.as_str());
            sent || received
        },
    }
}

/// In-memory [`Auth`] + [`Messaging`] implementation for simulation.
///
/// Seeded with `alice`/`secret` and `bob`/`hunter2`, and the channels
/// `general` and `random`.
pub struct ScriptedBackend {
    env: SimEnv,
    latency: Duration,
    token_ttl: Option<Duration>,
    world: Mutex<World>,
}

impl ScriptedBackend {
    /// Default call latency.
    pub const DEFAULT_LATENCY: Duration = Duration::from_millis(100);
    /// Default lifetime of issued tokens.
    pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

    /// Create the seeded world.
    pub fn new(env: SimEnv) -> Self {
        Self {
            env,
            latency: Self::DEFAULT_LATENCY,
            token_ttl: Some(Self::DEFAULT_TOKEN_TTL),
            world: Mutex::new(World::default()),
        }
        .with_user("alice", "secret")
        .with_user("bob", "hunter2")
        .with_channel("general", "general", "General chat")
        .with_channel("random", "random", "Off-topic")
    }

    /// Set the latency of every call.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Set the lifetime of issued tokens. `None` issues non-expiring tokens.
    #[must_use]
    pub fn with_token_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Add an account. Its id is `u-<username>`.
    #[must_use]
    pub fn with_user(self, username: &str, password: &str) -> Self {
        self.with_world(|world| {
            world.accounts.push(Account {
                user: User {
                    id: UserId::new(format!("u-{username}")),
                    username: username.to_string(),
                    email: format!("{username}@example.com"),
                },
                password: password.to_string(),
            });
        });
        self
    }

    /// Add a channel every account is a member of.
    #[must_use]
    pub fn with_channel(self, id: &str, name: &str, description: &str) -> Self {
        self.with_world(|world| {
            let members = world.accounts.iter().map(|a| a.user.id.clone()).collect();
            world.channels.push(Channel {
                id: ChannelId::from(id),
                name: name.to_string(),
                description: description.to_string(),
                members,
            });
        });
        self
    }

    /// Fail the next call of `op` with `error`. Failures queue up in order.
    pub fn fail_next(&self, op: BackendOp, error: TransportError) {
        self.with_world(|world| world.failures.entry(op).or_default().push_back(error));
    }

    /// Post a message as `author`, as if from another client. `None` if the
    /// author is unknown.
    pub fn post(&self, author: &str, conversation: Conversation, body: &str) -> Option<Message> {
        let now = self.env.now();
        self.with_world(|world| {
            let user = world.user_by_name(author)?.clone();
            Some(world.append(&user, conversation, body, now))
        })
    }

    /// Number of calls made to `op`, including failed ones.
    pub fn calls(&self, op: BackendOp) -> usize {
        self.with_world(|world| world.calls.get(&op).copied().unwrap_or(0))
    }

    /// Every stored message, in arrival order.
    pub fn messages(&self) -> Vec<Message> {
        self.with_world(|world| world.messages.clone())
    }

    /// Token the backend would issue to `username` right now.
    pub fn issue_token(&self, username: &str) -> Option<AccessToken> {
        let expires_at = self.expiry();
        self.with_world(|world| world.user_by_name(username).map(|u| sim_token(&u.id, expires_at)))
    }

    /// Account record of `username`.
    pub fn user(&self, username: &str) -> Option<User> {
        self.with_world(|world| world.user_by_name(username).cloned())
    }

    fn expiry(&self) -> Option<Timestamp> {
        self.token_ttl.map(|ttl| self.env.now().saturating_add(ttl))
    }

    fn with_world<T>(&self, f: impl FnOnce(&mut World) -> T) -> T {
        let mut world = self.world.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut world)
    }

    /// Resolve the bearer of `token`.
    fn authorize(&self, world: &World, token: &AccessToken) -> Result<User, TransportError> {
        let claims =
            SimTokenInspector.parse(token.as_str()).map_err(|_| TransportError::Unauthorized)?;
        if claims.is_expired(self.env.now()) {
            return Err(TransportError::Unauthorized);
        }
        world
            .accounts
            .iter()
            .map(|a| &a.user)
            .find(|u| u.id == claims.user_id)
            .cloned()
            .ok_or(TransportError::Unauthorized)
    }
}

impl Auth for ScriptedBackend {
    async fn login(&self, username: &str, password: &str) -> Result<AuthGrant, AuthError> {
        self.env.sleep(self.latency).await;
        let expires_at = self.expiry();
        self.with_world(|world| -> Result<AuthGrant, AuthError> {
            world.record(BackendOp::Login)?;
            let user = world
                .accounts
                .iter()
                .find(|a| a.user.username == username && a.password == password)
                .map(|a| a.user.clone())
                .ok_or(AuthError::InvalidCredentials)?;
            tracing::debug!(%username, "sim login");
            Ok(AuthGrant { token: sim_token(&user.id, expires_at), user })
        })
    }
}

impl Messaging for ScriptedBackend {
    async fn send(
        &self,
        token: &AccessToken,
        sender: &UserId,
        to: &Conversation,
        body: &str,
    ) -> Result<Message, TransportError> {
        self.env.sleep(self.latency).await;
        let now = self.env.now();
        self.with_world(|world| -> Result<Message, TransportError> {
            world.record(BackendOp::Send)?;
            let user = self.authorize(world, token)?;
            if &user.id != sender {
                return Err(TransportError::Status { status: 403, body: "sender mismatch".into() });
            }
            if body.trim().is_empty() {
                return Err(TransportError::Status { status: 400, body: "empty message".into() });
            }
            let known = match to {
                Conversation::Channel(id) => world.channels.iter().any(|c| &c.id == id),
                Conversation::Direct(peer) => world.user_by_name(peer).is_some(),
            };
            if !known {
                return Err(TransportError::Status { status: 404, body: format!("unknown {to}") });
            }
            Ok(world.append(&user, to.clone(), body, now))
        })
    }

    async fn fetch_history(
        &self,
        token: &AccessToken,
        conversation: &Conversation,
        since: Option<Timestamp>,
    ) -> Result<Vec<Message>, TransportError> {
        self.env.sleep(self.latency).await;
        self.with_world(|world| -> Result<Vec<Message>, TransportError> {
            world.record(BackendOp::FetchHistory)?;
            let viewer = self.authorize(world, token)?;
            // Newest first: callers must not rely on server order
            Ok(world
                .messages
                .iter()
                .rev()
                .filter(|m| visible_in(m, conversation, &viewer))
                .filter(|m| since.is_none_or(|since| m.sent_at >= since))
                .cloned()
                .collect())
        })
    }

    async fn list_channels(&self, token: &AccessToken) -> Result<Vec<Channel>, TransportError> {
        self.env.sleep(self.latency).await;
        self.with_world(|world| -> Result<Vec<Channel>, TransportError> {
            world.record(BackendOp::ListChannels)?;
            self.authorize(world, token)?;
            Ok(world.channels.clone())
        })
    }
}
