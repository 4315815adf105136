//! Readable tokens for simulation.
//!
//! Format: `sim:<user id>:<expiry millis | never>`. The scripted backend
//! issues them and [`SimTokenInspector`] reads them back, so expiry can be
//! tested without building JWTs.

use tchat_core::{AccessToken, Claims, Timestamp, TokenError, TokenInspector, UserId};

const PREFIX: &str = "sim:";
const NEVER: &str = "never";

/// Build a simulation token for `user` expiring at `expires_at`.
pub fn sim_token(user: &UserId, expires_at: Option<Timestamp>) -> AccessToken {
    let expiry = expires_at.map_or_else(|| NEVER.to_string(), |at| at.as_millis().to_string());
    AccessToken::new(format!("{PREFIX}{user}:{expiry}"))
}

/// Inspector for tokens built by [`sim_token`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SimTokenInspector;

impl TokenInspector for SimTokenInspector {
    fn parse(&self, token: &str) -> Result<Claims, TokenError> {
        let rest = token
            .strip_prefix(PREFIX)
            .ok_or_else(|| TokenError::Malformed("missing sim prefix".into()))?;
        let (user, expiry) = rest
            .rsplit_once(':')
            .ok_or_else(|| TokenError::Malformed("missing expiry".into()))?;
        if user.is_empty() {
            return Err(TokenError::MissingUserId);
        }

        let expires_at = match expiry {
            NEVER => None,
            millis => Some(Timestamp::from_millis(
                millis.parse().map_err(|_| TokenError::Malformed(format!("bad expiry {millis}")))?,
            )),
        };
        Ok(Claims { user_id: UserId::from(user), expires_at })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_back_issued_claims() {
        let token = sim_token(&UserId::from("u-1"), Some(Timestamp::from_millis(42)));
        let claims = SimTokenInspector.parse(token.as_str()).unwrap();

        assert_eq!(claims.user_id, UserId::from("u-1"));
        assert_eq!(claims.expires_at, Some(Timestamp::from_millis(42)));
    }

    #[test]
    fn never_expiring_token() {
        let token = sim_token(&UserId::from("u-1"), None);
        assert_eq!(SimTokenInspector.parse(token.as_str()).unwrap().expires_at, None);
    }

    #[test]
    fn rejects_foreign_tokens() {
        assert!(matches!(SimTokenInspector.parse("eyJhbGciOi"), Err(TokenError::Malformed(_))));
        assert!(matches!(SimTokenInspector.parse("sim::never"), Err(TokenError::MissingUserId)));
        assert!(matches!(SimTokenInspector.parse("sim:u-1:soon"), Err(TokenError::Malformed(_))));
    }
}
