//! Background execution of dispatched commands.
//!
//! Each [`Command`] runs on its own tokio task. A task owns the request
//! payload and shared collaborator handles, never session state; its only
//! output is one [`AppEvent`] carrying the command's handle, sent on the
//! results channel that the runtime drains.

use std::{collections::HashMap, sync::Arc};

use tchat_core::{Auth, AuthError, AuthGrant, Messaging, TokenInspector, TransportError};
use tokio::{
    sync::mpsc,
    task::{AbortHandle, JoinSet},
};

use crate::{AppEvent, Command, CommandKind, OpHandle, Request};

/// Spawns command tasks and aborts them on cancel.
pub struct CommandRunner<B> {
    backend: Arc<B>,
    inspector: Arc<dyn TokenInspector>,
    results: mpsc::UnboundedSender<AppEvent>,
    tasks: JoinSet<()>,
    aborts: HashMap<OpHandle, AbortHandle>,
}

impl<B> CommandRunner<B>
where
    B: Auth + Messaging,
{
    /// Create a runner delivering results on `results`.
    pub fn new(
        backend: Arc<B>,
        inspector: Arc<dyn TokenInspector>,
        results: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self { backend, inspector, results, tasks: JoinSet::new(), aborts: HashMap::new() }
    }

    /// Run `command` on a background task.
    pub fn spawn(&mut self, command: Command) {
        let backend = Arc::clone(&self.backend);
        let inspector = Arc::clone(&self.inspector);
        let results = self.results.clone();
        let handle = command.handle;

        let abort = self.tasks.spawn(async move {
            let event = execute(backend.as_ref(), inspector.as_ref(), command).await;
            if results.send(event).is_err() {
                tracing::debug!(%handle, "results channel closed, dropping result");
            }
        });
        self.aborts.insert(handle, abort);
    }

    /// Abort the task of `handle`. No-op if it already finished.
    pub fn cancel(&mut self, handle: OpHandle) {
        if let Some(abort) = self.aborts.remove(&handle) {
            tracing::debug!(%handle, "aborting command task");
            abort.abort();
        }
    }

    /// Forget tasks that have finished.
    pub fn reap(&mut self) {
        while self.tasks.try_join_next().is_some() {}
        self.aborts.retain(|_, abort| !abort.is_finished());
    }

    /// Number of tasks still running.
    pub fn in_flight(&self) -> usize {
        self.aborts.values().filter(|abort| !abort.is_finished()).count()
    }

    /// Abort every task.
    pub fn shutdown(&mut self) {
        self.tasks.abort_all();
        self.aborts.clear();
    }
}

/// Perform one command against the collaborators and reduce the outcome to
/// an event.
async fn execute<B>(backend: &B, inspector: &dyn TokenInspector, command: Command) -> AppEvent
where
    B: Auth + Messaging,
{
    let handle = command.handle;
    match command.request {
        Request::Login { username, password } => match backend.login(&username, &password).await {
            Ok(grant) => {
                let expires_at = match inspector.parse(grant.token.as_str()) {
                    Ok(claims) => claims.expires_at,
                    Err(error) => {
                        tracing::warn!(%error, "issued token has unreadable claims");
                        None
                    },
                };
                let AuthGrant { token, user } = grant;
                AppEvent::LoginSucceeded { handle, token, user, expires_at }
            },
            Err(AuthError::Transport(error)) => failed(handle, CommandKind::Login, &error),
            Err(error) => AppEvent::LoginFailed { handle, reason: error.to_string() },
        },
        Request::SendMessage { token, sender, conversation, body } => {
            match backend.send(&token, &sender, &conversation, &body).await {
                Ok(message) => AppEvent::MessageSent { handle, message },
                Err(error) => failed(handle, CommandKind::SendMessage, &error),
            }
        },
        Request::FetchHistory { token, conversation, since } => {
            match backend.fetch_history(&token, &conversation, since).await {
                Ok(messages) => AppEvent::HistoryFetched { handle, conversation, messages },
                Err(error) => failed(handle, CommandKind::FetchHistory, &error),
            }
        },
        Request::FetchChannels { token } => match backend.list_channels(&token).await {
            Ok(channels) => AppEvent::ChannelsFetched { handle, channels },
            Err(error) => failed(handle, CommandKind::FetchChannels, &error),
        },
    }
}

fn failed(handle: OpHandle, kind: CommandKind, error: &TransportError) -> AppEvent {
    AppEvent::OperationFailed { handle, kind, error: error.kind(), detail: error.to_string() }
}
