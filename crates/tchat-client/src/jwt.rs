//! Client-side JWT claim extraction.
//!
//! Tokens are decoded, never verified: the claims only drive expiry UX and
//! the server remains the authority on every request.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use tchat_core::{AccessToken, Claims, Timestamp, TokenError, TokenInspector, UserId};

/// Payload fields the client reads. `user_id` wins over `sub`.
#[derive(Debug, Serialize, Deserialize)]
struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
    /// Expiry in seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<u64>,
}

/// [`TokenInspector`] for JWT bearer tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtInspector;

impl TokenInspector for JwtInspector {
    fn parse(&self, token: &str) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed("expected three dot-separated segments".into()));
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| TokenError::Malformed(e.to_string()))?;
        let payload: Payload =
            serde_json::from_slice(&bytes).map_err(|e| TokenError::Malformed(e.to_string()))?;

        let user_id = payload
            .user_id
            .or(payload.sub)
            .filter(|id| !id.is_empty())
            .ok_or(TokenError::MissingUserId)?;
        let expires_at = payload.exp.map(|secs| Timestamp::from_millis(secs.saturating_mul(1000)));

        Ok(Claims { user_id: UserId::new(user_id), expires_at })
    }
}

/// Build an unsigned JWT (`alg: none`) carrying `user_id` and expiry.
///
/// Used by the offline demo backend; real servers sign their tokens.
pub fn unsigned_token(user_id: &UserId, expires_at: Option<Timestamp>) -> AccessToken {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = Payload {
        user_id: Some(user_id.to_string()),
        sub: None,
        exp: expires_at.map(|at| at.as_millis() / 1000),
    };
    // Serializing a struct of strings and integers cannot fail
    let json = serde_json::to_vec(&payload).unwrap_or_default();
    AccessToken::new(format!("{header}.{}.", URL_SAFE_NO_PAD.encode(json)))
}
