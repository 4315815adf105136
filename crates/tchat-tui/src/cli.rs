//! One-shot `send` and `read` commands.
//!
//! Both reuse the identity stored by the interactive client; neither logs in.
//! Output goes to the writer passed in, so `main` hands over stdout and tests
//! hand over a buffer.

use std::io::{self, Read, Write};

use tchat_client::HttpClient;
use tchat_core::{
    Conversation, Environment, Identity, IdentityStore, Messaging, StoreError, TokenError,
    TokenInspector, TransportError,
};
use thiserror::Error;

/// One-shot command errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// One-shot commands talk to a real server only.
    #[error("no server configured: pass --server or set TCHAT_SERVER_URL")]
    NoServer,

    /// Nobody has logged in on this machine.
    #[error("not logged in: run `tchat chat` and log in first")]
    NotLoggedIn,

    /// The stored token can no longer be used.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Recipient is empty after stripping `@`.
    #[error("recipient must be a username, e.g. @bob")]
    InvalidRecipient,

    /// Message is empty after trimming.
    #[error("message cannot be empty")]
    EmptyMessage,

    /// Identity store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Server request failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Reading stdin or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Normalize a recipient argument: `@bob` and `bob` both name `bob`.
pub fn recipient(arg: &str) -> Result<String, CliError> {
    let name = arg.trim().trim_start_matches('@');
    if name.is_empty() { Err(CliError::InvalidRecipient) } else { Ok(name.to_owned()) }
}

/// Message body from the argument, or from `stdin` when none was given.
/// Surrounding whitespace is trimmed.
pub fn message_body(arg: Option<String>, mut stdin: impl Read) -> Result<String, CliError> {
    let raw = match arg {
        Some(text) => text,
        None => {
            let mut text = String::new();
            stdin.read_to_string(&mut text)?;
            text
        },
    };
    let body = raw.trim();
    if body.is_empty() { Err(CliError::EmptyMessage) } else { Ok(body.to_owned()) }
}

/// The stored identity, if its token is readable and unexpired.
pub fn stored_session(
    store: &dyn IdentityStore,
    inspector: &dyn TokenInspector,
    env: &impl Environment,
) -> Result<Identity, CliError> {
    let identity = store.load()?.ok_or(CliError::NotLoggedIn)?;
    let claims = inspector.parse(identity.token.as_str())?;
    match claims.expires_at {
        Some(at) if claims.is_expired(env.now()) => Err(TokenError::Expired { at }.into()),
        _ => Ok(identity),
    }
}

/// Send `body` to `peer` and report it on `out`.
pub async fn send(
    messaging: &impl Messaging,
    identity: &Identity,
    peer: &str,
    body: &str,
    out: &mut impl Write,
) -> Result<(), CliError> {
    writeln!(out, "Sending message {peer:?}: {body:?}")?;
    let to = Conversation::Direct(peer.to_owned());
    let message = messaging.send(&identity.token, &identity.user.id, &to, body).await?;
    tracing::info!(id = %message.id, %to, "one-shot message sent");
    writeln!(out, "Message sent to {peer} ✓")?;
    Ok(())
}

/// Print the last message exchanged with `peer` on `out`.
pub async fn read(
    client: &HttpClient,
    identity: &Identity,
    peer: &str,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match client.last_message(&identity.token, &identity.user.id, peer).await? {
        Some(message) => writeln!(out, "{}", message.body)?,
        None => writeln!(out, "No messages found between you and {peer}")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tchat_client::{DemoBackend, JwtInspector, RedbIdentityStore, SystemEnv, unsigned_token};
    use tchat_core::{Auth, Timestamp, User, UserId};

    use super::*;

    fn identity(expires_at: Option<Timestamp>) -> Identity {
        let user = User { id: UserId::from("u-1"), username: "demo".into(), email: String::new() };
        Identity { token: unsigned_token(&user.id, expires_at), user }
    }

    #[test]
    fn recipient_strips_at_sign() {
        assert_eq!(recipient("@bob").unwrap(), "bob");
        assert_eq!(recipient(" bob ").unwrap(), "bob");
        assert!(matches!(recipient("@"), Err(CliError::InvalidRecipient)));
    }

    #[test]
    fn message_from_argument_or_stdin() {
        assert_eq!(message_body(Some("  hi  ".into()), io::empty()).unwrap(), "hi");
        assert_eq!(message_body(None, "from pipe\n".as_bytes()).unwrap(), "from pipe");
        assert!(matches!(message_body(None, " \n".as_bytes()), Err(CliError::EmptyMessage)));
        let empty = message_body(Some(String::new()), io::empty());
        assert!(matches!(empty, Err(CliError::EmptyMessage)));
    }

    #[test]
    fn stored_session_requires_unexpired_identity() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbIdentityStore::open(dir.path().join("tchat.redb")).unwrap();
        let env = SystemEnv::new();

        let err = stored_session(&store, &JwtInspector, &env).unwrap_err();
        assert!(matches!(err, CliError::NotLoggedIn));

        let expired = identity(Some(Timestamp::from_millis(1_000_000)));
        store.save(&expired).unwrap();
        let err = stored_session(&store, &JwtInspector, &env).unwrap_err();
        assert!(matches!(err, CliError::Token(TokenError::Expired { .. })));

        let valid = identity(Some(env.now().saturating_add(Duration::from_secs(3600))));
        store.save(&valid).unwrap();
        assert_eq!(stored_session(&store, &JwtInspector, &env).unwrap(), valid);
    }

    #[tokio::test]
    async fn send_reports_delivery() {
        let backend = DemoBackend::new(SystemEnv::new());
        let grant = backend.login("demo", "demo").await.unwrap();
        let identity = Identity { user: grant.user, token: grant.token };

        let mut out = Vec::new();
        send(&backend, &identity, "echo", "ping", &mut out).await.unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert_eq!(printed, "Sending message \"echo\": \"ping\"\nMessage sent to echo ✓\n");
    }

    #[tokio::test]
    async fn send_to_unknown_user_fails() {
        let backend = DemoBackend::new(SystemEnv::new());
        let grant = backend.login("demo", "demo").await.unwrap();
        let identity = Identity { user: grant.user, token: grant.token };

        let err = send(&backend, &identity, "nobody", "hi", &mut io::sink()).await.unwrap_err();
        assert!(matches!(err, CliError::Transport(TransportError::Status { status: 404, .. })));
    }
}
