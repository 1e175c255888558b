//! Error types for the service layer.

use thiserror::Error;

/// Errors that can occur in service operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IMAP operation failed.
    #[error("IMAP error: {0}")]
    Imap(#[from] webmail_imap::Error),

    /// A part could not be decoded.
    #[error("MIME error: {0}")]
    Mime(#[from] webmail_mime::Error),

    /// The mailbox holds no message with this UID.
    #[error("No message {uid} in {mailbox}")]
    MessageNotFound {
        /// Mailbox that was searched.
        mailbox: String,
        /// Requested UID.
        uid: u32,
    },

    /// The message has no part with this section path.
    #[error("Message {uid} has no part {part}")]
    PartNotFound {
        /// Message UID.
        uid: u32,
        /// Requested section path.
        part: String,
    },

    /// The server refused a user-initiated action; carries its reason.
    #[error("Operation failed: {0}")]
    Operation(String),

    /// Every pooled connection is in use.
    #[error("Connection pool is full ({0} identities)")]
    PoolFull(usize),
}

impl Error {
    /// Turns a server refusal into [`Error::Operation`] so the web tier can
    /// show the server's reason; other errors are wrapped unchanged.
    pub(crate) fn from_refusal(error: webmail_imap::Error) -> Self {
        match error.server_reason() {
            Some(reason) => Self::Operation(reason.to_string()),
            None => Self::Imap(error),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refusal_keeps_server_reason() {
        let error = Error::from_refusal(webmail_imap::Error::No("[TRYCREATE] no such folder".into()));
        assert_eq!(error.to_string(), "Operation failed: [TRYCREATE] no such folder");

        let error = Error::from_refusal(webmail_imap::Error::ConnectionLost("gone".into()));
        assert!(matches!(error, Error::Imap(_)));
    }
}
