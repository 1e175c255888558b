//! IMAP connection management.
//!
//! - Configuration (host, port, security mode, timeouts) and credentials
//! - TLS/plaintext stream abstraction
//! - Framed I/O that hands literals over byte-exact
//! - Type-state client enforcing the login boundary
//! - Connectors producing greeted clients
//! - The per-user session with selection memo and re-login on demand

mod client;
mod config;
mod connector;
mod framed;
pub(crate) mod session;
mod stream;

pub use client::{Authenticated, Client, Completion, NotAuthenticated, QuotaRootReply};
pub use config::{Config, ConfigBuilder, Credentials, Security};
pub use connector::{Connector, QueuedConnector, TcpConnector};
pub use framed::{FramedStream, ResponseAccumulator};
pub use session::{
    DEFAULT_DELIMITER, MessageItems, OVERVIEW_HEADERS, Selection, Session, SessionState,
};
pub use stream::{ImapStream, create_tls_connector, open};
