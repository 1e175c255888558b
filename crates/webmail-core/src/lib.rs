//! # webmail-core
//!
//! The service layer between a webmail front end and its IMAP server.
//!
//! This crate provides:
//! - A connection pool with one session per user, probed before reuse
//! - Header records keyed by [`HeaderField`], with decoded addresses
//! - Message list pages, message views and attachment downloads
//! - Flag, move and folder operations that report the server's reason
//!   when refused
//!
//! ```ignore
//! use webmail_core::{MailService, WebmailConfig};
//! use webmail_imap::{Config, ContentFormat, Credentials};
//!
//! let service = MailService::connect(WebmailConfig::new(Config::new("imap.example.com")));
//! let alice = Credentials::new("alice", "secret");
//!
//! let page = service.list_page(&alice, "INBOX", "-date", None, 1, 40).await?;
//! if let Some(first) = page.items.first() {
//!     let view = service.message_view(&alice, "INBOX", first.uid, ContentFormat::Html).await?;
//!     println!("{}", view.body);
//! }
//! service.logout("alice").await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
pub mod header;
pub mod pool;
pub mod service;

pub use config::{FolderNames, WebmailConfig, WebmailConfigBuilder};
pub use error::{Error, Result};
pub use header::{Address, HeaderField, HeaderRecord};
pub use pool::{ConnectionPool, PooledSession};
pub use service::{Attachment, MailService, MessagePage, MessageSummary, MessageView};
