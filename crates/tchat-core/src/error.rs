//! Error types shared across tchat.
//!
//! Collaborator errors are strongly typed per concern. The session reducer
//! never holds these objects: results are reduced to an [`ErrorKind`] plus a
//! human-readable detail before they cross into the event stream.

use thiserror::Error;

use crate::Timestamp;

/// Coarse classification of a failed network operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Server unreachable, connection reset, timeout.
    Network,
    /// Server answered with a non-success status.
    Status,
    /// Response body could not be decoded.
    Decode,
    /// Server rejected the credentials or token.
    Unauthorized,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Network => "network error",
            Self::Status => "server error",
            Self::Decode => "invalid response",
            Self::Unauthorized => "unauthorized",
        };
        f.write_str(label)
    }
}

/// Errors from the messaging transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established or was interrupted.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Server returned a non-success status code.
    #[error("server error ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// Response could not be decoded.
    #[error("failed to parse response: {0}")]
    Decode(String),

    /// Token missing, invalid or expired server-side.
    #[error("unauthorized")]
    Unauthorized,
}

impl TransportError {
    /// Classification for UI reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) => ErrorKind::Network,
            Self::Status { .. } => ErrorKind::Status,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Unauthorized => ErrorKind::Unauthorized,
        }
    }
}

/// Errors from the authentication service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Username or password rejected.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Session token expired.
    #[error("session expired, please log in again")]
    TokenExpired,

    /// Login rejected for another reason reported by the server.
    #[error("login rejected: {0}")]
    Rejected(String),

    /// Transport failure while talking to the auth service.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors from the local identity store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Underlying database failure.
    #[error("storage I/O error: {0}")]
    Io(String),

    /// Stored record could not be encoded or decoded.
    #[error("storage codec error: {0}")]
    Codec(String),
}

/// Errors from token inspection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Token is not a well-formed JWT.
    #[error("failed to parse access token claims: {0}")]
    Malformed(String),

    /// Claims carry no usable user id.
    #[error("user ID not found or invalid in token claims")]
    MissingUserId,

    /// Token expired client-side.
    #[error("token expired client-side (at {})", at.clock_time())]
    Expired {
        /// Expiry time from the claims.
        at: Timestamp,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_kinds() {
        assert_eq!(TransportError::Connection("reset".into()).kind(), ErrorKind::Network);
        assert_eq!(
            TransportError::Status { status: 500, body: String::new() }.kind(),
            ErrorKind::Status
        );
        assert_eq!(TransportError::Decode("eof".into()).kind(), ErrorKind::Decode);
        assert_eq!(TransportError::Unauthorized.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn status_error_message_includes_code_and_body() {
        let err = TransportError::Status { status: 404, body: "no such user".into() };
        assert_eq!(err.to_string(), "server error (404): no such user");
    }
}
