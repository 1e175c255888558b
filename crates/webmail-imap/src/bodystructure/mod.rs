//! BODYSTRUCTURE interpretation.
//!
//! The server describes a message as a tree of parts. This module turns
//! that tree into what a mail viewer needs: which part to render as the
//! body, which parts to offer as downloads, and which images an HTML body
//! references by Content-ID.
//!
//! # Example
//!
//! ```
//! use webmail_imap::bodystructure::{Classification, ContentFormat};
//! use webmail_imap::parser::{Lexer, Value};
//!
//! let wire = concat!(
//!     r#"(("TEXT" "PLAIN" ("CHARSET" "utf-8") NIL NIL "7BIT" 5 1) "#,
//!     r#"("APPLICATION" "PDF" ("NAME" "q3.pdf") NIL NIL "BASE64" 900) "MIXED")"#,
//! );
//! let structure = Value::parse(&mut Lexer::new(wire.as_bytes())).unwrap();
//! let classification = Classification::classify(&structure).unwrap();
//!
//! assert_eq!(classification.preferred_format(ContentFormat::Html), Some(ContentFormat::Plain));
//! assert_eq!(classification.find_attachment("2").unwrap().filename, "q3.pdf");
//! ```

mod classify;
mod filename;
mod part;

pub use classify::{Classification, ContentFormat};
pub use part::{Disposition, PartDescriptor};

/// A BODYSTRUCTURE the classifier could not read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed body structure at part '{path}': {message}")]
pub struct StructureError {
    /// Part number of the offending node; empty for the root.
    pub path: String,
    /// What was wrong with it.
    pub message: String,
}

impl StructureError {
    pub(crate) fn new(path: &str, message: &str) -> Self {
        Self {
            path: path.to_string(),
            message: message.to_string(),
        }
    }
}
