//! Error types for MIME decoding.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME decoding errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Base64 payload is malformed.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Quoted-printable escape is malformed.
    #[error("Invalid quoted-printable data: {0}")]
    QuotedPrintable(String),

    /// RFC 2047 encoded word or RFC 2231 value is malformed.
    #[error("Invalid encoded word: {0}")]
    EncodedWord(String),

    /// Charset is unknown, or the bytes are invalid in it.
    #[error("Charset error: {0}")]
    Charset(String),
}
