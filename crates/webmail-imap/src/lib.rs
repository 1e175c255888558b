//! # webmail-imap
//!
//! The IMAP side of a webmail backend: everything between a browser
//! request and the mail server, short of rendering.
//!
//! ## Features
//!
//! - **Wire decoder**: response framing that keeps literals byte-exact,
//!   and a typed tree for BODYSTRUCTURE and friends
//! - **Type-state client**: mailbox commands only exist after `LOGIN`
//! - **Session manager**: capability and namespace discovery, memoized
//!   `SELECT`, transparent re-login after a dropped connection
//! - **Body-structure classifier**: bodies, attachments and inline images
//!   with RFC 2231/2047 filenames
//! - **Mailbox hierarchy**: the same folder tree over `LIST-EXTENDED` or
//!   plain `LIST`, with unseen counts
//! - **Quota**: `GETQUOTAROOT` usage as a percentage
//! - **TLS via rustls**: implicit TLS or `STARTTLS`, no OpenSSL
//!
//! ## Quick Start
//!
//! ```ignore
//! use webmail_imap::{Config, Credentials, Security, Session, TcpConnector};
//! use webmail_imap::hierarchy::ListOptions;
//!
//! #[tokio::main]
//! async fn main() -> webmail_imap::Result<()> {
//!     let config = Config::builder("imap.example.com").security(Security::Implicit).build();
//!     let connector = TcpConnector::new(config);
//!     let mut session =
//!         Session::open(connector, Credentials::new("user@example.com", "password")).await?;
//!
//!     let folders = session
//!         .mailboxes(&ListOptions::new().pinned(["INBOX", "Sent"]).with_unseen(true))
//!         .await?;
//!     for folder in &folders {
//!         println!("{} ({:?} unseen)", folder.path, folder.unseen);
//!     }
//!
//!     let total = session.messages_count("INBOX", "-date", None).await?;
//!     println!("{total} messages");
//!
//!     session.logout().await
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! ┌─────────────────────┐
//! │   NotAuthenticated  │ ─── login() ───→ Authenticated
//! └─────────────────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │    Authenticated    │ ─── select()/examine() ───→ Selected (tracked by Session)
//! └─────────────────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │      LoggedOut      │ terminal
//! └─────────────────────┘
//! ```
//!
//! A dropped connection sends a [`Session`] back to `NotAuthenticated`;
//! [`Session::refresh`] logs in again.
//!
//! ## Modules
//!
//! - [`command`]: IMAP command builders and types
//! - [`connection`]: Transport, type-state client and session
//! - [`parser`]: Sans-I/O response parser
//! - [`bodystructure`]: Part classification
//! - [`hierarchy`]: Folder tree
//! - [`quota`]: Storage quota
//! - [`types`]: Core IMAP types (flags, mailboxes, UIDs, etc.)
//! - [`utf7`]: Modified UTF-7 mailbox names

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod bodystructure;
pub mod command;
pub mod connection;
mod error;
pub mod hierarchy;
pub mod parser;
pub mod quota;
pub mod types;
pub mod utf7;

pub use bodystructure::{Classification, ContentFormat, PartDescriptor, StructureError};
pub use command::{Command, FetchAttribute, SearchCriteria, SortCriterion, StoreAction};
pub use connection::{
    Authenticated, Client, Completion, Config, ConfigBuilder, Connector, Credentials,
    MessageItems, NotAuthenticated, OVERVIEW_HEADERS, QueuedConnector, Security, Selection,
    Session, SessionState, TcpConnector,
};
pub use error::{Error, Result};
pub use hierarchy::{ListOptions, MailboxNode, separate_mailbox};
pub use parser::{DecodeError, FetchBatch, FetchRecord, Response, ResponseParser, Value};
pub use quota::Quota;
pub use types::{
    Capability, Flag, Flags, ListResponse, Mailbox, MailboxAttribute, MailboxStatus, ResponseCode,
    Status, Tag, Uid, UidSet, UidValidity,
};
