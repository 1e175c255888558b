//! # webmail-mime
//!
//! Decoding helpers for the MIME data an IMAP server hands back: transfer
//! encodings, charsets, RFC 2047 encoded words, RFC 2231 parameters and
//! raw header blocks.
//!
//! ```
//! use webmail_mime::words::decode_encoded_words;
//!
//! let subject = decode_encoded_words("=?ISO-8859-1?Q?caf=E9?=").unwrap();
//! assert_eq!(subject, "caf\u{e9}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
mod header;

pub mod charset;
pub mod encoding;
pub mod param;
pub mod words;

pub use encoding::TransferEncoding;
pub use error::{Error, Result};
pub use header::Headers;
