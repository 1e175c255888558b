//! Error types for the IMAP core.

use std::time::Duration;

use thiserror::Error;

use crate::bodystructure::StructureError;
use crate::parser::DecodeError;

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Protocol parsing error.
    #[error("Protocol error at position {position}: {message}")]
    Parse {
        /// Byte position where the error occurred.
        position: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// A FETCH fragment could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A BODYSTRUCTURE tree has an unexpected shape.
    #[error(transparent)]
    Structure(#[from] StructureError),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Server returned NO response.
    #[error("Server returned NO: {0}")]
    No(String),

    /// Server returned BAD response.
    #[error("Server returned BAD: {0}")]
    Bad(String),

    /// Server sent BYE (disconnecting).
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// Operation timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid state for the requested operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A command argument cannot be put on the wire.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Protocol violation or unexpected data.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The transport is gone; the session must log in again.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),
}

impl Error {
    /// Returns true if the error means the underlying connection can no
    /// longer be trusted. A rejected login counts: the caller must start
    /// over with fresh credentials.
    #[must_use]
    pub const fn is_connection_fault(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::Auth(_)
                | Self::Tls(_)
                | Self::InvalidDnsName(_)
                | Self::Bye(_)
                | Self::Timeout(_)
                | Self::ConnectionLost(_)
        )
    }

    /// Returns the server's reason for a `NO`/`BAD` completion.
    #[must_use]
    pub fn server_reason(&self) -> Option<&str> {
        match self {
            Self::No(text) | Self::Bad(text) => Some(text),
            _ => None,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_faults() {
        let io = Error::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
        assert!(io.is_connection_fault());
        assert!(Error::Bye("shutting down".into()).is_connection_fault());
        assert!(!Error::No("no such mailbox".into()).is_connection_fault());
        assert!(!Error::InvalidState("not selected".into()).is_connection_fault());
        assert!(!Error::InvalidArgument("CR in filter".into()).is_connection_fault());
    }

    #[test]
    fn server_reason() {
        assert_eq!(
            Error::No("Mailbox doesn't exist".into()).server_reason(),
            Some("Mailbox doesn't exist")
        );
        assert_eq!(Error::Protocol("x".into()).server_reason(), None);
    }
}
