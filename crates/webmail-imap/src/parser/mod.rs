//! IMAP protocol parser.
//!
//! Sans-I/O: everything here works on byte slices that already hold a
//! complete response, as delivered by the framed reader.
//!
//! - **Lexer**: tokenizes raw bytes; literals are handed over byte-exact.
//! - **Value**: the parse tree for parenthesized data such as BODYSTRUCTURE.
//! - **Fetch**: groups FETCH data items per message, tolerating bad responses.
//! - **Response**: typed status and untagged data responses.
//!
//! # Example
//!
//! ```
//! use webmail_imap::parser::{Response, ResponseParser, UntaggedResponse};
//!
//! let response = ResponseParser::parse(b"* OK IMAP4rev1 server ready\r\n").unwrap();
//!
//! match response {
//!     Response::Untagged(UntaggedResponse::Ok { text, .. }) => {
//!         assert!(text.contains("IMAP4rev1"));
//!     }
//!     _ => panic!("Expected untagged OK"),
//! }
//! ```

pub mod fetch;
pub mod lexer;
pub mod response;
pub mod value;

pub use fetch::{DecodeError, FetchBatch, FetchRecord};
pub use lexer::{Lexer, Token};
pub use response::{QuotaResource, Response, ResponseParser, StatusItem, UntaggedResponse};
pub use value::Value;
