//! Error types for the civic session core

use std::time::Duration;
use thiserror::Error;

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// HTTP status the server uses to reject a credential
pub const UNAUTHORIZED: u16 = 401;

/// Session error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Server replied with a non-success status
    #[error("Server error {status}: {message}")]
    Remote { status: u16, message: String },

    /// Request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// Request did not settle in time
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Token storage could not be read or written
    #[error("Token store error: {0}")]
    TokenStore(String),

    /// Operation is not valid from the current bootstrap phase
    #[error("Operation `{operation}` not allowed in phase {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SessionError {
    /// Build a remote error from a status code and response body
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        SessionError::Remote {
            status,
            message: message.into(),
        }
    }

    /// HTTP status carried by the error, if the server produced one
    pub fn status(&self) -> Option<u16> {
        match self {
            SessionError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the server rejected the credential
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(UNAUTHORIZED)
    }

    /// Classify a failed session restore.
    ///
    /// A rejected credential is an ordinary "signed out" outcome; everything
    /// else fails the attempt and waits for an explicit retry.
    pub fn classify_restore(&self) -> FailureClass {
        if self.is_unauthorized() {
            FailureClass::CredentialRejected
        } else {
            FailureClass::TransientRestoreFailure
        }
    }
}

/// Failure taxonomy for the session core.
///
/// Session-level failures block progress until retried; per-action failures
/// revert locally and never block navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// No stored credential, resolves to a signed-out ready state
    NoCredential,
    /// Server answered 401, resolves to a signed-out ready state
    CredentialRejected,
    /// Network, timeout or parse failure during restore
    TransientRestoreFailure,
    /// Toggle or status-check failure, rolled back locally
    ActionSyncFailure,
}

impl FailureClass {
    /// Whether this class surfaces a blocking, retry-able error screen
    pub fn is_blocking(&self) -> bool {
        matches!(self, FailureClass::TransientRestoreFailure)
    }
}

#[cfg(feature = "client")]
impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return SessionError::Network(format!("timeout: {}", err));
        }
        if err.is_decode() {
            return SessionError::InvalidResponse(err.to_string());
        }
        match err.status() {
            Some(status) => SessionError::remote(status.as_u16(), err.to_string()),
            None => SessionError::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_is_credential_rejected() {
        let err = SessionError::remote(401, "token expired");
        assert!(err.is_unauthorized());
        assert_eq!(err.classify_restore(), FailureClass::CredentialRejected);
        assert!(!err.classify_restore().is_blocking());
    }

    #[test]
    fn test_other_failures_are_transient() {
        let cases = [
            SessionError::remote(500, "boom"),
            SessionError::remote(403, "forbidden"),
            SessionError::Timeout(Duration::from_secs(15)),
            SessionError::Network("connection refused".into()),
            SessionError::InvalidResponse("missing field `id`".into()),
        ];

        for err in cases {
            assert_eq!(err.classify_restore(), FailureClass::TransientRestoreFailure);
            assert!(err.classify_restore().is_blocking());
        }
    }

    #[test]
    fn test_message_text_does_not_drive_classification() {
        // A 500 whose body mentions 401 is still a server fault
        let err = SessionError::remote(500, "upstream returned 401");
        assert!(!err.is_unauthorized());
        assert_eq!(err.classify_restore(), FailureClass::TransientRestoreFailure);
    }
}
